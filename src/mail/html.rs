use std::sync::LazyLock;

use regex::Regex;

static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| compile(r"(?is)<style\b[^>]*>.*?</style\s*>"));
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?is)<script\b[^>]*>.*?</script\s*>"));
static PARAGRAPH_END: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)</(p|div|h[1-6]|blockquote|table)\s*>"));
static LINE_END: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)</(tr|li)\s*>|<br\s*/?>"));
static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#)
});
static TAG: LazyLock<Regex> = LazyLock::new(|| compile(r"<[^>]+>"));
static HORIZONTAL_SPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"[ \t]+"));
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| compile(r"\n{3,}"));

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("invalid built-in pattern {pattern}: {err}"),
    }
}

/// Degrades an HTML body to readable plain text.
///
/// Paragraph-level closing tags become a blank line, row/item ends and `<br>` a single
/// newline, and links keep their target as `text [url]`.
pub fn html_to_text(html: &str) -> String {
    let text = STYLE_BLOCK.replace_all(html, "");
    let text = SCRIPT_BLOCK.replace_all(&text, "");
    let text = PARAGRAPH_END.replace_all(&text, "\n\n");
    let text = LINE_END.replace_all(&text, "\n");
    let text = ANCHOR.replace_all(&text, "${2} [${1}]");
    let text = TAG.replace_all(&text, "");
    let text = html_escape::decode_html_entities(&text);
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");

    text.trim().to_string()
}
