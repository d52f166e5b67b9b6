use std::fs;

use pmail::error::AppError;
use pmail::mail::body;
use pmail::mail::compose::{OutgoingMessage, compose};

fn outgoing(body: &str) -> OutgoingMessage {
    OutgoingMessage {
        from: "Me <me@proton.me>".to_string(),
        to: vec!["ada@example.com".to_string()],
        subject: "Status".to_string(),
        body: body.to_string(),
        ..OutgoingMessage::default()
    }
}

fn header_block(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let end = text.find("\r\n\r\n").unwrap_or(text.len());
    text[..end].to_string()
}

#[test]
fn ascii_body_survives_compose_and_resolve() {
    let original = format!(
        "Hi Ada,\n\nThe build is green = ready to ship.\n{}\n-- me\n",
        "a long line that goes well past the seventy six character limit of quoted printable text"
    );
    let composed = compose(outgoing(&original)).expect("compose");

    let resolved = body::resolve(&composed.bytes);
    assert_eq!(resolved.text.as_deref(), Some(original.as_str()));
    assert!(resolved.html.is_none());
}

#[test]
fn non_ascii_subject_is_encoded() {
    let message = OutgoingMessage {
        subject: "Café".to_string(),
        ..outgoing("hello")
    };
    let composed = compose(message).expect("compose");

    let headers = header_block(&composed.bytes);
    let subject = headers
        .lines()
        .find(|line| line.starts_with("Subject: "))
        .expect("subject header");
    assert!(subject["Subject: ".len()..].starts_with("=?utf-8?"));
}

#[test]
fn output_uses_crlf_only() {
    let composed = compose(outgoing("one\ntwo\r\nthree")).expect("compose");
    let text = String::from_utf8(composed.bytes).expect("ascii output");
    assert!(!text.replace("\r\n", "").contains('\n'));
}

#[test]
fn attachment_message_keeps_text_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes.txt");
    fs::write(&path, "attached notes").expect("write attachment");

    let message = OutgoingMessage {
        attachments: vec![path],
        ..outgoing("See attached.")
    };
    let composed = compose(message).expect("compose");
    let text = String::from_utf8_lossy(&composed.bytes).into_owned();

    assert!(text.contains("Content-Type: multipart/mixed; boundary=\""));
    assert!(text.contains("Content-Disposition: attachment; filename=\"notes.txt\""));
    assert!(text.trim_end().ends_with("--"));

    let resolved = body::resolve(&composed.bytes);
    assert_eq!(
        resolved.text.as_deref().map(str::trim_end),
        Some("See attached.")
    );
}

#[test]
fn missing_attachment_aborts_compose() {
    let dir = tempfile::tempdir().expect("tempdir");
    let present = dir.path().join("present.txt");
    fs::write(&present, "here").expect("write attachment");

    let message = OutgoingMessage {
        attachments: vec![present, dir.path().join("missing.pdf")],
        ..outgoing("body")
    };

    match compose(message) {
        Err(AppError::AttachmentNotFound(path)) => assert!(path.ends_with("missing.pdf")),
        other => panic!("expected AttachmentNotFound, got {other:?}"),
    }
}

#[test]
fn bcc_stays_out_of_headers() {
    let message = OutgoingMessage {
        bcc: vec!["Hidden <hidden@example.com>".to_string()],
        ..outgoing("body")
    };
    let composed = compose(message).expect("compose");

    assert!(!header_block(&composed.bytes).contains("hidden@example.com"));
    assert_eq!(
        composed.recipients,
        vec!["ada@example.com", "hidden@example.com"]
    );
    assert_eq!(composed.sender, "me@proton.me");
}
