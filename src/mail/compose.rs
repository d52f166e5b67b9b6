use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Local;
use rand::Rng;

use crate::error::{AppError, AppResult};
use crate::mail::encoding::{encode_base64_wrapped, encode_header_value, encode_quoted_printable};

const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
}

/// A serialized message plus its SMTP envelope.
#[derive(Debug, Clone)]
pub struct ComposedMessage {
    pub sender: String,
    pub recipients: Vec<String>,
    pub bytes: Vec<u8>,
}

struct LoadedAttachment {
    filename: String,
    mime_type: String,
    data: Vec<u8>,
}

/// Serializes `message` into an RFC 5322 stream with CRLF line endings.
///
/// Attachments are read up front so a missing file aborts before anything is built.
pub fn compose(message: OutgoingMessage) -> AppResult<ComposedMessage> {
    let attachments = read_attachments(&message.attachments)?;
    let mut headers = build_base_headers(&message);

    let payload = if attachments.is_empty() {
        headers.push("Content-Type: text/plain; charset=utf-8".to_string());
        headers.push("Content-Transfer-Encoding: quoted-printable".to_string());
        format!(
            "{}\r\n\r\n{}",
            headers.join("\r\n"),
            encode_quoted_printable(&message.body)
        )
    } else {
        let boundary = random_boundary();
        headers.push(format!(
            "Content-Type: multipart/mixed; boundary=\"{boundary}\""
        ));
        format!(
            "{}\r\n\r\n{}",
            headers.join("\r\n"),
            multipart_body(&message.body, &attachments, &boundary)
        )
    };

    let recipients = message
        .to
        .iter()
        .chain(&message.cc)
        .chain(&message.bcc)
        .map(|address| bare_address(address))
        .filter(|address| !address.is_empty())
        .collect();

    Ok(ComposedMessage {
        sender: bare_address(&message.from),
        recipients,
        bytes: payload.into_bytes(),
    })
}

fn build_base_headers(message: &OutgoingMessage) -> Vec<String> {
    let mut headers = Vec::new();
    headers.push(format!("From: {}", sanitize_header_value(&message.from)));
    headers.push(format!("To: {}", join_addresses(&message.to)));

    if !message.cc.is_empty() {
        headers.push(format!("Cc: {}", join_addresses(&message.cc)));
    }

    headers.push(format!(
        "Subject: {}",
        encode_header_value(&sanitize_header_value(&message.subject))
    ));
    headers.push(format!("Date: {}", Local::now().format(DATE_FORMAT)));
    headers.push(format!("Message-ID: {}", new_message_id(&message.from)));

    if let Some(in_reply_to) = &message.in_reply_to {
        headers.push(format!("In-Reply-To: {}", sanitize_header_value(in_reply_to)));
    }
    if let Some(references) = &message.references {
        headers.push(format!("References: {}", sanitize_header_value(references)));
    }

    headers.push("MIME-Version: 1.0".to_string());
    headers
}

fn multipart_body(body: &str, attachments: &[LoadedAttachment], boundary: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("--{boundary}\r\n"));
    out.push_str("Content-Type: text/plain; charset=utf-8\r\n");
    out.push_str("Content-Transfer-Encoding: quoted-printable\r\n\r\n");
    out.push_str(&encode_quoted_printable(body));
    out.push_str("\r\n");

    for attachment in attachments {
        let filename = escape_header_value(&attachment.filename);
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str(&format!(
            "Content-Type: {}; name=\"{filename}\"\r\n",
            attachment.mime_type
        ));
        out.push_str("Content-Transfer-Encoding: base64\r\n");
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{filename}\"\r\n\r\n"
        ));
        out.push_str(&encode_base64_wrapped(&attachment.data));
    }

    out.push_str(&format!("--{boundary}--\r\n"));
    out
}

fn read_attachments(paths: &[PathBuf]) -> AppResult<Vec<LoadedAttachment>> {
    let mut attachments = Vec::with_capacity(paths.len());

    for path in paths {
        let data = fs::read(path).map_err(|err| attachment_error(path, err))?;
        let filename = path
            .file_name()
            .map(|value| value.to_string_lossy().to_string())
            .ok_or_else(|| {
                AppError::InvalidInput(format!("invalid attachment path: {}", path.display()))
            })?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        attachments.push(LoadedAttachment {
            filename,
            mime_type,
            data,
        });
    }

    Ok(attachments)
}

fn attachment_error(path: &Path, err: io::Error) -> AppError {
    if err.kind() == io::ErrorKind::NotFound {
        AppError::AttachmentNotFound(path.display().to_string())
    } else {
        AppError::AttachmentUnreadable {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

fn join_addresses(addresses: &[String]) -> String {
    addresses
        .iter()
        .map(|address| sanitize_header_value(address))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extracts `user@host` from `Name <user@host>`.
pub fn bare_address(address: &str) -> String {
    let trimmed = address.trim();
    match (trimmed.rfind('<'), trimmed.rfind('>')) {
        (Some(start), Some(end)) if start < end => trimmed[start + 1..end].trim().to_string(),
        _ => trimmed.to_string(),
    }
}

fn new_message_id(from: &str) -> String {
    let address = bare_address(from);
    let domain = address
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
        .unwrap_or("localhost");
    format!("<{}@{domain}>", random_token(18))
}

fn random_boundary() -> String {
    format!("pmail-{}", random_token(12))
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0_u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Strips characters that would break out of a header line.
pub fn sanitize_header_value(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|value| *value != '\r' && *value != '\n')
        .collect()
}

fn escape_header_value(value: &str) -> String {
    sanitize_header_value(value).replace('"', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            from: "Me <me@example.com>".to_string(),
            to: vec!["dev@example.com".to_string()],
            subject: "Test".to_string(),
            body: "Hello".to_string(),
            ..OutgoingMessage::default()
        }
    }

    fn text(composed: &ComposedMessage) -> String {
        String::from_utf8(composed.bytes.clone()).expect("utf8 payload")
    }

    #[test]
    fn includes_reply_headers() {
        let composed = compose(OutgoingMessage {
            subject: "Re: Test".to_string(),
            in_reply_to: Some("<id@example.com>".to_string()),
            references: Some("<ref@example.com> <id@example.com>".to_string()),
            ..message()
        })
        .expect("compose");

        let raw = text(&composed);
        assert!(raw.contains("\r\nIn-Reply-To: <id@example.com>\r\n"));
        assert!(raw.contains("\r\nReferences: <ref@example.com> <id@example.com>\r\n"));
    }

    #[test]
    fn bcc_only_reaches_the_envelope() {
        let composed = compose(OutgoingMessage {
            cc: vec!["Cc Person <cc@example.com>".to_string()],
            bcc: vec!["hidden@example.com".to_string()],
            ..message()
        })
        .expect("compose");

        let raw = text(&composed);
        assert!(!raw.contains("hidden@example.com"));
        assert!(raw.contains("\r\nCc: Cc Person <cc@example.com>\r\n"));
        assert_eq!(composed.sender, "me@example.com");
        assert_eq!(
            composed.recipients,
            vec!["dev@example.com", "cc@example.com", "hidden@example.com"]
        );
    }

    #[test]
    fn message_id_uses_sender_domain() {
        let raw = text(&compose(message()).expect("compose"));
        let line = raw
            .lines()
            .find(|line| line.starts_with("Message-ID: "))
            .expect("message id header");
        assert!(line.ends_with("@example.com>"));
    }

    #[test]
    fn strips_header_injection() {
        let raw = text(
            &compose(OutgoingMessage {
                subject: "hi\r\nBcc: evil@example.com".to_string(),
                ..message()
            })
            .expect("compose"),
        );
        assert!(raw.contains("Subject: hiBcc: evil@example.com\r\n"));
        assert!(!raw.contains("\r\nBcc:"));
    }

    #[test]
    fn extracts_bare_addresses() {
        assert_eq!(bare_address("Jane <jane@x.io>"), "jane@x.io");
        assert_eq!(bare_address(" jane@x.io "), "jane@x.io");
    }
}
