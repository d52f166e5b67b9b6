use serde::Serialize;

use crate::api::ListOptions;
use crate::api::models::{BatchResult, Message, MessageSummary};
use crate::cli::{DraftCommand, DraftCreateArgs, DraftDeleteArgs, DraftEditArgs};
use crate::context::AppContext;
use crate::error::AppResult;
use crate::mail::compose::{self, OutgoingMessage};
use crate::mail::sequence;
use crate::output::text::truncate;

use super::send::read_body;

#[derive(Debug, Serialize)]
struct DraftSaved {
    mailbox: String,
    replaced: Option<String>,
    to: Vec<String>,
    subject: String,
}

pub async fn run(ctx: &AppContext, command: DraftCommand) -> AppResult<()> {
    match command {
        DraftCommand::List(args) => {
            let mut client = ctx.connect_imap()?;
            let drafts_mailbox = client.folders().drafts.clone();
            let drafts = client.list(
                &drafts_mailbox,
                ListOptions {
                    limit: args.limit,
                    offset: 0,
                    unread_only: false,
                },
            )?;
            client.logout()?;

            ctx.output.emit_table(
                &["ID", "DATE", "TO", "SUBJECT"],
                &draft_rows(&drafts),
                "0 drafts",
                &drafts,
            )
        }
        DraftCommand::Create(args) => create(ctx, args),
        DraftCommand::Edit(args) => edit(ctx, args),
        DraftCommand::Delete(args) => delete(ctx, args),
    }
}

fn create(ctx: &AppContext, args: DraftCreateArgs) -> AppResult<()> {
    let message = OutgoingMessage {
        from: ctx.settings.from_header()?,
        to: args.to,
        cc: args.cc,
        bcc: Vec::new(),
        subject: args.subject.unwrap_or_default(),
        body: read_body(&args.body)?.unwrap_or_default(),
        attachments: args.attach,
        in_reply_to: None,
        references: None,
    };
    let saved = summary(ctx, &message, None);
    let composed = compose::compose(message)?;

    let mut client = ctx.connect_imap()?;
    client.save_draft(&composed.bytes)?;
    client.logout()?;

    let text = format!("saved draft \"{}\" to {}", saved.subject, saved.mailbox);
    ctx.output.emit(&text, &saved)
}

/// Rebuilds the draft with the given fields replaced; the rest comes from the stored draft.
fn edit(ctx: &AppContext, args: DraftEditArgs) -> AppResult<()> {
    sequence::build(&[args.id.as_str()])?;
    let body = read_body(&args.body)?;

    let mut client = ctx.connect_imap()?;
    let drafts_mailbox = client.folders().drafts.clone();
    let existing = client.get(&drafts_mailbox, &args.id)?;

    let message = merge_draft(&existing, ctx.settings.from_header()?, args, body);
    let saved = summary(ctx, &message, Some(existing.seq.to_string()));
    let composed = compose::compose(message)?;

    client.replace_draft(&existing.seq.to_string(), &composed.bytes)?;
    client.logout()?;

    let text = format!("updated draft \"{}\" in {}", saved.subject, saved.mailbox);
    ctx.output.emit(&text, &saved)
}

fn merge_draft(
    existing: &Message,
    from: String,
    args: DraftEditArgs,
    body: Option<String>,
) -> OutgoingMessage {
    OutgoingMessage {
        from,
        to: if args.to.is_empty() {
            existing.to.clone()
        } else {
            args.to
        },
        cc: if args.cc.is_empty() {
            existing.cc.clone()
        } else {
            args.cc
        },
        bcc: Vec::new(),
        subject: args.subject.unwrap_or_else(|| existing.subject.clone()),
        body: body.unwrap_or_else(|| existing.body().display_text()),
        attachments: args.attach,
        in_reply_to: existing.in_reply_to.clone(),
        references: existing.references.clone(),
    }
}

fn delete(ctx: &AppContext, args: DraftDeleteArgs) -> AppResult<()> {
    let set = sequence::build(&args.ids)?;

    let mut client = ctx.connect_imap()?;
    let drafts_mailbox = client.folders().drafts.clone();
    let target = client.resolve_targets(&drafts_mailbox, &args.ids, None)?;
    if let Some(target) = &target {
        client.purge(target)?;
    }
    client.logout()?;

    let result = BatchResult {
        mailbox: drafts_mailbox,
        action: "deleted".to_string(),
        ids: set.to_string(),
        count: set.len(),
    };
    let text = format!("deleted {} draft(s): {}", result.count, result.ids);
    ctx.output.emit(&text, &result)
}

fn summary(ctx: &AppContext, message: &OutgoingMessage, replaced: Option<String>) -> DraftSaved {
    DraftSaved {
        mailbox: ctx.settings.drafts_mailbox().to_string(),
        replaced,
        to: message.to.clone(),
        subject: message.subject.clone(),
    }
}

fn draft_rows(drafts: &[MessageSummary]) -> Vec<Vec<String>> {
    drafts
        .iter()
        .map(|draft| {
            let to = if draft.to.is_empty() {
                "(no recipients)".to_string()
            } else {
                draft.to.join(", ")
            };
            let subject = if draft.subject.trim().is_empty() {
                "(no subject)"
            } else {
                draft.subject.as_str()
            };
            vec![
                draft.seq.to_string(),
                draft.date.clone().unwrap_or_default(),
                truncate(&to, 32),
                truncate(subject, 72),
            ]
        })
        .collect()
}
