use serde::Serialize;

use crate::api::models::Message;
use crate::api::{FlagChanges, Selection};
use crate::cli::ReadArgs;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::mail::sequence::SequenceSet;
use crate::mail::structure::AttachmentDescriptor;
use crate::output::OutputMode;
use crate::protocol::Flag;

#[derive(Debug, Serialize)]
struct ReadResult<'a> {
    mailbox: &'a str,
    #[serde(flatten)]
    message: &'a Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachments: Option<Vec<AttachmentDescriptor>>,
}

pub async fn run(ctx: &AppContext, args: ReadArgs) -> AppResult<()> {
    let mailbox = ctx.mailbox(args.mailbox.as_deref());
    let mut client = ctx.connect_imap()?;
    let message = client.get(&mailbox, &args.id)?;

    if !message.flags.contains(&Flag::Seen) {
        if let Some(set) = SequenceSet::single(message.seq) {
            let target = Selection {
                mailbox: mailbox.clone(),
                set,
            };
            let changes = FlagChanges {
                add: vec![Flag::Seen],
                remove: Vec::new(),
            };
            client.set_flags(&target, &changes)?;
        }
    }

    let attachments = if args.attachments {
        Some(client.attachments(&mailbox, &args.id)?)
    } else {
        None
    };
    client.logout()?;

    if args.raw {
        let raw = String::from_utf8_lossy(&message.raw).into_owned();
        let result = ReadResult {
            mailbox: &mailbox,
            message: &message,
            body: None,
            html: None,
            headers: None,
            raw: Some(raw.clone()),
            attachments,
        };
        return ctx.output.emit(&raw, &result);
    }

    let resolved = message.body();
    let body = if args.html {
        resolved.html.clone().unwrap_or_else(|| resolved.display_text())
    } else {
        resolved.display_text()
    };
    let headers = args.headers.then(|| message.raw_headers());

    if ctx.output.mode() == OutputMode::Text {
        let text = render_text(&message, headers.as_deref(), &body, attachments.as_deref());
        return ctx.output.emit(&text, &());
    }

    let result = ReadResult {
        mailbox: &mailbox,
        message: &message,
        body: Some(body),
        html: resolved.html,
        headers,
        raw: None,
        attachments,
    };
    ctx.output.emit("", &result)
}

fn render_text(
    message: &Message,
    headers: Option<&str>,
    body: &str,
    attachments: Option<&[AttachmentDescriptor]>,
) -> String {
    let mut out = String::new();
    match headers {
        Some(headers) => out.push_str(headers.trim_end()),
        None => {
            out.push_str(&format!("From: {}\n", message.from));
            out.push_str(&format!("To: {}\n", message.to.join(", ")));
            if !message.cc.is_empty() {
                out.push_str(&format!("Cc: {}\n", message.cc.join(", ")));
            }
            if let Some(date) = &message.date {
                out.push_str(&format!("Date: {date}\n"));
            }
            out.push_str(&format!("Subject: {}", message.subject));
        }
    }

    out.push_str("\n\n");
    out.push_str(body.trim_end());

    if let Some(attachments) = attachments {
        out.push_str(&format!("\n\nAttachments ({}):", attachments.len()));
        for attachment in attachments {
            let size = attachment
                .size
                .map(|size| format!(", {size} bytes"))
                .unwrap_or_default();
            out.push_str(&format!(
                "\n  [{}] {} ({}{size})",
                attachment.index, attachment.filename, attachment.content_type
            ));
        }
    }

    out
}
