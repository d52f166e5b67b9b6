mod common;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::SpySession;
use pmail::api::{Folders, MailClient};
use pmail::error::AppError;
use pmail::mail::structure::{MimeNode, walk};

/// Pre-order positions: 1 mixed, 2 pdf, 3 related, 4 text, 5 png, 6 html, 7 zip.
fn tree() -> MimeNode {
    MimeNode::multipart(
        "mixed",
        vec![
            MimeNode::leaf("application", "pdf")
                .with_disposition("attachment", Some("report.pdf"))
                .with_encoding("base64")
                .with_size(2048),
            MimeNode::multipart(
                "related",
                vec![
                    MimeNode::leaf("text", "plain").with_param("charset", "utf-8"),
                    MimeNode::leaf("image", "png")
                        .with_param("name", "logo.png")
                        .with_encoding("base64")
                        .with_size(12),
                    MimeNode::leaf("text", "html").with_disposition("inline", None),
                ],
            ),
            MimeNode::leaf("application", "zip")
                .with_disposition("attachment", Some("bundle.zip"))
                .with_encoding("base64"),
        ],
    )
}

fn client_with_tree() -> MailClient<SpySession> {
    let mut session = SpySession::with_messages(3);
    session.structure = Some(tree());
    session.parts.insert(
        "2.2".to_string(),
        STANDARD.encode(b"\x89PNG fake image").into_bytes(),
    );
    MailClient::new(session, Folders::default())
}

#[test]
fn indices_follow_pre_order_attachment_rank() {
    let found = walk(&tree());
    let summary = found
        .iter()
        .map(|attachment| {
            (
                attachment.index,
                attachment.part_path.to_string(),
                attachment.filename.as_str(),
            )
        })
        .collect::<Vec<_>>();

    assert_eq!(
        summary,
        vec![
            (0, "1".to_string(), "report.pdf"),
            (1, "2.2".to_string(), "logo.png"),
            (2, "3".to_string(), "bundle.zip"),
        ]
    );
}

#[test]
fn listing_fetches_structure_only() {
    let mut client = client_with_tree();
    let attachments = client.attachments("INBOX", "2").expect("attachments");
    assert_eq!(attachments.len(), 3);

    let calls = client.into_session().calls;
    assert_eq!(calls, vec!["SELECT INBOX", "FETCH 2 BODYSTRUCTURE"]);
}

#[test]
fn download_fetches_only_the_located_part() {
    let mut client = client_with_tree();
    let attachment = client
        .download_attachment("INBOX", "2", 1)
        .expect("download");

    assert_eq!(attachment.filename, "logo.png");
    assert_eq!(attachment.content_type, "image/png");
    assert_eq!(attachment.part_path.to_string(), "2.2");
    assert_eq!(attachment.data.as_deref(), Some(&b"\x89PNG fake image"[..]));

    let calls = client.into_session().calls;
    assert_eq!(
        calls,
        vec!["SELECT INBOX", "FETCH 2 BODYSTRUCTURE", "FETCH 2 BODY[2.2]"]
    );
}

#[test]
fn out_of_range_index_is_attachment_not_found() {
    let mut client = client_with_tree();
    assert!(matches!(
        client.download_attachment("INBOX", "2", 3),
        Err(AppError::AttachmentNotFound(_))
    ));
}

#[test]
fn message_beyond_mailbox_is_not_found() {
    let mut client = client_with_tree();
    assert!(matches!(
        client.attachments("INBOX", "9"),
        Err(AppError::MessageNotFound(_))
    ));
}
