//! Transfer and header encodings used when composing and reading messages.

use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Longest encoded line allowed by RFC 2045, excluding the CRLF.
pub const MAX_LINE_LENGTH: usize = 76;

/// Longest RFC 2047 encoded word.
const MAX_ENCODED_WORD: usize = 75;

/// Normalizes bare `\n` and lone `\r` line endings to CRLF.
pub fn normalize_crlf(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 32);
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            other => out.push(other),
        }
    }
    out
}

/// Quoted-printable encodes `text` line by line, keeping CRLF hard breaks.
///
/// Printable ASCII lines that fit in 76 columns and contain no `=` come out unchanged.
pub fn encode_quoted_printable(text: &str) -> String {
    let normalized = normalize_crlf(text);
    let lines = normalized.split("\r\n").collect::<Vec<_>>();
    let mut out = String::with_capacity(normalized.len());

    for (index, line) in lines.iter().enumerate() {
        encode_qp_line(line, &mut out);
        if index + 1 < lines.len() {
            out.push_str("\r\n");
        }
    }

    out
}

fn encode_qp_line(line: &str, out: &mut String) {
    let bytes = line.as_bytes();
    let mut width = 0;

    for (index, byte) in bytes.iter().enumerate() {
        let last = index + 1 == bytes.len();
        let mut token = String::with_capacity(3);
        match byte {
            b'!'..=b'<' | b'>'..=b'~' => token.push(*byte as char),
            b' ' | b'\t' if !last => token.push(*byte as char),
            _ => {
                let _ = write!(token, "={byte:02X}");
            }
        }

        // Leave room for the soft break `=` unless this token ends the line.
        let limit = if last {
            MAX_LINE_LENGTH
        } else {
            MAX_LINE_LENGTH - 1
        };
        if width + token.len() > limit {
            out.push_str("=\r\n");
            width = 0;
        }

        out.push_str(&token);
        width += token.len();
    }
}

/// Decodes quoted-printable text. Malformed escapes are kept literally.
pub fn decode_quoted_printable(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        let byte = bytes[index];
        if byte != b'=' {
            out.push(byte);
            index += 1;
            continue;
        }

        let rest = &bytes[index + 1..];
        if rest.starts_with(b"\r\n") {
            index += 3;
        } else if rest.starts_with(b"\n") {
            index += 2;
        } else if let Some(value) = rest.get(..2).and_then(hex_pair) {
            out.push(value);
            index += 3;
        } else {
            out.push(byte);
            index += 1;
        }
    }

    out
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    let text = std::str::from_utf8(pair).ok()?;
    u8::from_str_radix(text, 16).ok()
}

/// Decodes base64 content that may be wrapped across lines.
pub fn decode_base64_lenient(data: &[u8]) -> Option<Vec<u8>> {
    let compact = data
        .iter()
        .copied()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect::<Vec<_>>();
    STANDARD.decode(compact).ok()
}

/// Base64 encodes `data` and wraps it at 76 characters per CRLF-terminated line.
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);
    let mut start = 0;
    while start < encoded.len() {
        let end = (start + MAX_LINE_LENGTH).min(encoded.len());
        out.push_str(&encoded[start..end]);
        out.push_str("\r\n");
        start = end;
    }
    out
}

/// Encodes a header value as RFC 2047 `Q` words when it holds non-ASCII text.
///
/// ASCII values are returned verbatim. Long values are split on character
/// boundaries into several words joined by folding whitespace.
pub fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }

    const PREFIX: &str = "=?utf-8?Q?";
    const SUFFIX: &str = "?=";
    let budget = MAX_ENCODED_WORD - PREFIX.len() - SUFFIX.len();

    let mut words = Vec::new();
    let mut current = String::new();
    for ch in value.chars() {
        let mut encoded = String::new();
        let mut buf = [0_u8; 4];
        for byte in ch.encode_utf8(&mut buf).as_bytes() {
            match byte {
                b' ' => encoded.push('_'),
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'!' | b'*' | b'+' | b'-' | b'/' => {
                    encoded.push(*byte as char)
                }
                _ => {
                    let _ = write!(encoded, "={byte:02X}");
                }
            }
        }

        if current.len() + encoded.len() > budget {
            words.push(format!("{PREFIX}{current}{SUFFIX}"));
            current.clear();
        }
        current.push_str(&encoded);
    }
    if !current.is_empty() {
        words.push(format!("{PREFIX}{current}{SUFFIX}"));
    }

    words.join("\r\n ")
}
