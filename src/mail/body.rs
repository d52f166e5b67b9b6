//! Extracts readable text and HTML bodies from raw RFC 5322 messages.

use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};
use serde::Serialize;
use tracing::debug;

use crate::mail::encoding::{decode_base64_lenient, decode_quoted_printable};
use crate::mail::html::html_to_text;

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct ResolvedBody {
    pub text: Option<String>,
    pub html: Option<String>,
}

impl ResolvedBody {
    /// Plain text when present, otherwise the HTML body degraded to text.
    pub fn display_text(&self) -> String {
        match (&self.text, &self.html) {
            (Some(text), _) => text.clone(),
            (None, Some(html)) => html_to_text(html),
            (None, None) => String::new(),
        }
    }
}

/// Resolves the first text/plain and text/html bodies of `raw`. Never fails.
///
/// Line endings in the returned bodies are `\n`.
pub fn resolve(raw: &[u8]) -> ResolvedBody {
    let resolved = resolve_raw(raw);
    ResolvedBody {
        text: resolved.text.map(|text| unix_newlines(&text)),
        html: resolved.html.map(|html| unix_newlines(&html)),
    }
}

fn unix_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

fn resolve_raw(raw: &[u8]) -> ResolvedBody {
    let Some(message) = MessageParser::default().parse(raw) else {
        debug!(bytes = raw.len(), "message did not parse, using raw text");
        return ResolvedBody {
            text: Some(String::from_utf8_lossy(raw).into_owned()),
            html: None,
        };
    };

    match &message.root_part().body {
        PartType::Multipart(children) => {
            let mut resolved = ResolvedBody::default();
            collect_parts(&message, children, &mut resolved);
            resolved
        }
        _ => resolve_single_part(raw),
    }
}

fn collect_parts(message: &Message<'_>, children: &[usize], resolved: &mut ResolvedBody) {
    for id in children {
        let Some(part) = message.parts.get(*id) else {
            continue;
        };
        if is_attachment(part) {
            continue;
        }

        match &part.body {
            PartType::Text(text) if resolved.text.is_none() && is_subtype(part, "plain") => {
                resolved.text = Some(text.to_string());
            }
            PartType::Html(html) if resolved.html.is_none() => {
                resolved.html = Some(html.to_string());
            }
            PartType::Multipart(nested) => collect_parts(message, nested, resolved),
            _ => {}
        }
    }
}

fn is_attachment(part: &MessagePart<'_>) -> bool {
    part.content_disposition()
        .is_some_and(|disposition| disposition.ctype().eq_ignore_ascii_case("attachment"))
}

fn is_subtype(part: &MessagePart<'_>, subtype: &str) -> bool {
    part.content_type()
        .and_then(|content_type| content_type.subtype())
        .is_none_or(|declared| declared.eq_ignore_ascii_case(subtype))
}

fn resolve_single_part(raw: &[u8]) -> ResolvedBody {
    let Some((headers, body)) = split_headers(raw) else {
        return ResolvedBody::default();
    };

    let content_type = header_value(headers, "content-type").unwrap_or_default();
    let encoding = header_value(headers, "content-transfer-encoding").unwrap_or_default();
    let decoded = decode_transfer(body, &encoding);
    let text = String::from_utf8_lossy(&decoded).into_owned();

    if content_type.to_ascii_lowercase().starts_with("text/html") {
        ResolvedBody {
            text: None,
            html: Some(text),
        }
    } else {
        ResolvedBody {
            text: Some(text),
            html: None,
        }
    }
}

/// Decodes a part body according to its Content-Transfer-Encoding.
pub fn decode_transfer(body: &[u8], encoding: &str) -> Vec<u8> {
    match encoding.trim().to_ascii_lowercase().as_str() {
        "base64" => decode_base64_lenient(body).unwrap_or_else(|| body.to_vec()),
        "quoted-printable" => decode_quoted_printable(&String::from_utf8_lossy(body)),
        _ => body.to_vec(),
    }
}

fn split_headers(raw: &[u8]) -> Option<(&str, &[u8])> {
    let (header_end, body_start) = find(raw, b"\r\n\r\n")
        .map(|index| (index, index + 4))
        .or_else(|| find(raw, b"\n\n").map(|index| (index, index + 2)))?;
    let headers = std::str::from_utf8(&raw[..header_end]).ok()?;
    Some((headers, &raw[body_start..]))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Returns the unfolded value of the first header named `name`.
fn header_value(headers: &str, name: &str) -> Option<String> {
    let mut value: Option<String> = None;
    for line in headers.lines() {
        if let Some(current) = value.as_mut() {
            if line.starts_with([' ', '\t']) {
                current.push(' ');
                current.push_str(line.trim());
                continue;
            }
            break;
        }

        match line.split_once(':') {
            Some((key, rest)) if key.trim().eq_ignore_ascii_case(name) => {
                value = Some(rest.trim().to_string());
            }
            _ => {}
        }
    }
    value
}
