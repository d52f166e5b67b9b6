use std::fs;
use std::io::{self, Read};

use tracing::info;

use crate::api::models::{Message, SendOutcome, SendResult};
use crate::cli::{BodyArgs, ForwardArgs, ReplyArgs, SendArgs};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::mail::compose::{self, OutgoingMessage, bare_address};
use crate::protocol::SmtpSession;

const FORWARD_MARKER: &str = "---------- Forwarded message ----------";

pub async fn run(ctx: &AppContext, args: SendArgs) -> AppResult<()> {
    if args.to.is_empty() {
        return Err(AppError::InvalidInput("--to is required".to_string()));
    }

    let subject = args
        .subject
        .ok_or_else(|| AppError::InvalidInput("--subject is required".to_string()))?;
    let body = require_body(&args.body)?;

    let message = OutgoingMessage {
        from: ctx.settings.from_header()?,
        to: args.to,
        cc: args.cc,
        bcc: args.bcc,
        subject,
        body,
        attachments: args.attach,
        in_reply_to: None,
        references: None,
    };
    let result = deliver(ctx, args.idempotency_key.as_deref(), message)?;
    emit_result(ctx, &result)
}

pub async fn reply(ctx: &AppContext, args: ReplyArgs) -> AppResult<()> {
    let body = require_body(&args.body)?;
    let mailbox = ctx.mailbox(args.mailbox.as_deref());

    let mut client = ctx.connect_imap()?;
    let parent = client.get(&mailbox, &args.id)?;
    client.logout()?;

    let own_address = ctx.settings.email()?.to_string();
    let (to, cc) = reply_recipients(&parent, &own_address, args.all)?;
    let quoted = quote_body(&parent, &parent.body().display_text());

    let message = OutgoingMessage {
        from: ctx.settings.from_header()?,
        to,
        cc,
        bcc: Vec::new(),
        subject: ensure_reply_subject(&parent.subject),
        body: format!("{}\n\n{quoted}", body.trim_end()),
        attachments: args.attach,
        in_reply_to: parent.message_id.clone(),
        references: merge_references(parent.references.clone(), parent.message_id.clone()),
    };
    let result = deliver(ctx, args.idempotency_key.as_deref(), message)?;
    emit_result(ctx, &result)
}

pub async fn forward(ctx: &AppContext, args: ForwardArgs) -> AppResult<()> {
    let note = read_body(&args.body)?.unwrap_or_default();
    let mailbox = ctx.mailbox(args.mailbox.as_deref());

    let mut client = ctx.connect_imap()?;
    let original = client.get(&mailbox, &args.id)?;
    client.logout()?;

    let block = forwarded_block(&original, &original.body().display_text());
    let body = if note.trim().is_empty() {
        block
    } else {
        format!("{}\n\n{block}", note.trim_end())
    };

    let message = OutgoingMessage {
        from: ctx.settings.from_header()?,
        to: args.to,
        cc: args.cc,
        bcc: Vec::new(),
        subject: ensure_forward_subject(&original.subject),
        body,
        attachments: args.attach,
        in_reply_to: None,
        references: None,
    };
    let result = deliver(ctx, args.idempotency_key.as_deref(), message)?;
    emit_result(ctx, &result)
}

/// Sends `message` unless `idempotency_key` was already used.
///
/// The ledger lock is held from the check until the key is recorded.
fn deliver(
    ctx: &AppContext,
    idempotency_key: Option<&str>,
    message: OutgoingMessage,
) -> AppResult<SendResult> {
    let mut result = SendResult {
        outcome: SendOutcome::Sent,
        to: message.to.clone(),
        cc: message.cc.clone(),
        subject: message.subject.clone(),
        in_reply_to: message.in_reply_to.clone(),
    };

    let key = idempotency_key
        .map(str::trim)
        .filter(|key| !key.is_empty());
    let ledger = ctx.ledger();
    let _lock = match key {
        Some(_) => Some(ledger.lock()?),
        None => None,
    };

    if let Some(key) = key {
        if ledger.contains(key)? {
            info!(key, "duplicate send suppressed");
            result.outcome = SendOutcome::DuplicateSuppressed;
            return Ok(result);
        }
    }

    let composed = compose::compose(message)?;
    let mut smtp = ctx.connect_smtp()?;
    smtp.send(&composed)?;
    info!(recipients = composed.recipients.len(), "message sent");

    if let Some(key) = key {
        ledger.record(key)?;
    }
    Ok(result)
}

fn emit_result(ctx: &AppContext, result: &SendResult) -> AppResult<()> {
    let text = match result.outcome {
        SendOutcome::Sent => format!("sent \"{}\" to {}", result.subject, result.to.join(", ")),
        SendOutcome::DuplicateSuppressed => {
            "duplicate suppressed: idempotency key already used".to_string()
        }
    };
    ctx.output.emit(&text, result)
}

fn require_body(args: &BodyArgs) -> AppResult<String> {
    read_body(args)?.ok_or_else(|| {
        AppError::InvalidInput(
            "missing body source; pass one of --body, --body-file, or --stdin".to_string(),
        )
    })
}

/// Reads the body from whichever single source was given.
pub fn read_body(args: &BodyArgs) -> AppResult<Option<String>> {
    let selected = [args.body.is_some(), args.body_file.is_some(), args.stdin]
        .into_iter()
        .filter(|selected| *selected)
        .count();

    if selected > 1 {
        return Err(AppError::InvalidInput(
            "pass only one body source: --body, --body-file, or --stdin".to_string(),
        ));
    }

    if let Some(body) = &args.body {
        return Ok(Some(body.clone()));
    }

    if let Some(path) = &args.body_file {
        return Ok(Some(fs::read_to_string(path)?));
    }

    if args.stdin {
        let mut body = String::new();
        io::stdin().read_to_string(&mut body)?;
        return Ok(Some(body));
    }

    Ok(None)
}

/// Sender (or Reply-To) first; with `all`, the other recipients too, minus our own address.
fn reply_recipients(
    parent: &Message,
    own_address: &str,
    all: bool,
) -> AppResult<(Vec<String>, Vec<String>)> {
    let primary = parent
        .reply_to
        .clone()
        .or_else(|| Some(parent.from.clone()).filter(|from| !from.trim().is_empty()))
        .ok_or_else(|| {
            AppError::InvalidInput("unable to infer reply recipient from the message".to_string())
        })?;

    let mut to = vec![primary];
    let mut cc = Vec::new();
    if all {
        let is_own = |address: &String| bare_address(address).eq_ignore_ascii_case(own_address);
        for address in &parent.to {
            let already = to
                .iter()
                .any(|existing| bare_address(existing).eq_ignore_ascii_case(&bare_address(address)));
            if !is_own(address) && !already {
                to.push(address.clone());
            }
        }
        cc.extend(parent.cc.iter().filter(|address| !is_own(address)).cloned());
    }

    Ok((to, cc))
}

fn quote_body(parent: &Message, body: &str) -> String {
    let date = parent.date.as_deref().unwrap_or("an earlier date");
    let quoted = body
        .trim_end()
        .lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("On {date}, {} wrote:\n{quoted}", parent.from)
}

fn forwarded_block(original: &Message, body: &str) -> String {
    format!(
        "{FORWARD_MARKER}\nFrom: {}\nDate: {}\nSubject: {}\nTo: {}\n\n{}",
        original.from,
        original.date.as_deref().unwrap_or_default(),
        original.subject,
        original.to.join(", "),
        body.trim_end()
    )
}

fn ensure_reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    if trimmed.to_ascii_lowercase().starts_with("re:") {
        trimmed.to_string()
    } else {
        format!("Re: {trimmed}")
    }
}

fn ensure_forward_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("fwd:") || lower.starts_with("fw:") {
        trimmed.to_string()
    } else {
        format!("Fwd: {trimmed}")
    }
}

fn merge_references(existing: Option<String>, message_id: Option<String>) -> Option<String> {
    let message_id = message_id?.trim().to_string();
    if message_id.is_empty() {
        return existing;
    }

    let mut refs = existing
        .unwrap_or_default()
        .split_whitespace()
        .map(ToOwned::to_owned)
        .collect::<Vec<_>>();
    if !refs.iter().any(|value| value == &message_id) {
        refs.push(message_id);
    }

    Some(refs.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> Message {
        Message {
            uid: Some(7),
            seq: 3,
            message_id: Some("<p1@example.com>".to_string()),
            in_reply_to: None,
            references: Some("<root@example.com>".to_string()),
            date: Some("Mon, 12 Oct 2026 09:30:00 +0000".to_string()),
            from: "Ada <ada@example.com>".to_string(),
            reply_to: None,
            to: vec![
                "me@proton.me".to_string(),
                "Grace <grace@example.com>".to_string(),
            ],
            cc: vec!["ME@proton.me".to_string(), "linus@example.com".to_string()],
            subject: "Plans".to_string(),
            flags: Vec::new(),
            size: None,
            raw: Vec::new(),
        }
    }

    #[test]
    fn adds_reply_prefix_once() {
        assert_eq!(ensure_reply_subject("Plans"), "Re: Plans");
        assert_eq!(ensure_reply_subject("RE: Plans"), "RE: Plans");
    }

    #[test]
    fn adds_forward_prefix_once() {
        assert_eq!(ensure_forward_subject("Plans"), "Fwd: Plans");
        assert_eq!(ensure_forward_subject("Fw: Plans"), "Fw: Plans");
    }

    #[test]
    fn merges_references_without_duplicates() {
        assert_eq!(
            merge_references(Some("<a@x>".to_string()), Some("<b@x>".to_string())).as_deref(),
            Some("<a@x> <b@x>")
        );
        assert_eq!(
            merge_references(Some("<a@x> <b@x>".to_string()), Some("<b@x>".to_string()))
                .as_deref(),
            Some("<a@x> <b@x>")
        );
        assert_eq!(merge_references(None, None), None);
    }

    #[test]
    fn replies_to_sender_only_by_default() {
        let (to, cc) = reply_recipients(&parent(), "me@proton.me", false).expect("recipients");
        assert_eq!(to, vec!["Ada <ada@example.com>"]);
        assert!(cc.is_empty());
    }

    #[test]
    fn reply_all_drops_own_address() {
        let (to, cc) = reply_recipients(&parent(), "me@proton.me", true).expect("recipients");
        assert_eq!(to, vec!["Ada <ada@example.com>", "Grace <grace@example.com>"]);
        assert_eq!(cc, vec!["linus@example.com"]);
    }

    #[test]
    fn reply_to_header_wins_over_sender() {
        let mut message = parent();
        message.reply_to = Some("lists@example.com".to_string());
        let (to, _) = reply_recipients(&message, "me@proton.me", false).expect("recipients");
        assert_eq!(to, vec!["lists@example.com"]);
    }

    #[test]
    fn quotes_every_line() {
        let quoted = quote_body(&parent(), "first\nsecond\n");
        assert_eq!(
            quoted,
            "On Mon, 12 Oct 2026 09:30:00 +0000, Ada <ada@example.com> wrote:\n> first\n> second"
        );
    }

    #[test]
    fn forwarded_block_lists_original_headers() {
        let block = forwarded_block(&parent(), "hello");
        assert!(block.starts_with(FORWARD_MARKER));
        assert!(block.contains("\nSubject: Plans\n"));
        assert!(block.contains("\nTo: me@proton.me, Grace <grace@example.com>\n"));
        assert!(block.ends_with("\n\nhello"));
    }

    #[test]
    fn rejects_multiple_body_sources() {
        let args = BodyArgs {
            body: Some("x".to_string()),
            body_file: None,
            stdin: true,
        };
        assert!(matches!(read_body(&args), Err(AppError::InvalidInput(_))));
        assert!(read_body(&BodyArgs::default()).expect("no body").is_none());
    }
}
