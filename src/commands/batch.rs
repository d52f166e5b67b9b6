use crate::api::models::BatchResult;
use crate::api::{FlagChanges, MailClient, Selection};
use crate::cli::{DeleteArgs, FlagArgs, MoveArgs, TargetArgs};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::mail::sequence;
use crate::protocol::{BridgeImap, Flag, ImapSession};

pub async fn delete(ctx: &AppContext, args: DeleteArgs) -> AppResult<()> {
    let mailbox = ctx.mailbox(args.mailbox.as_deref());
    let action = if args.permanent { "deleted" } else { "trashed" };
    with_targets(ctx, &mailbox, &args.target, action, |client, target| {
        client.delete(target, args.permanent)
    })
}

pub async fn move_messages(ctx: &AppContext, args: MoveArgs) -> AppResult<()> {
    let destination = args.destination.trim();
    if destination.is_empty() {
        return Err(AppError::InvalidInput(
            "--destination must not be empty".to_string(),
        ));
    }

    let mailbox = ctx.mailbox(args.mailbox.as_deref());
    let action = format!("moved to {destination}");
    with_targets(ctx, &mailbox, &args.target, &action, |client, target| {
        client.move_to(target, destination)
    })
}

pub async fn flag(ctx: &AppContext, args: FlagArgs) -> AppResult<()> {
    let changes = flag_changes(&args);
    if changes.is_empty() {
        return Err(AppError::InvalidInput(
            "pass at least one of --read, --unread, --star, --unstar".to_string(),
        ));
    }

    let mailbox = ctx.mailbox(args.mailbox.as_deref());
    with_targets(ctx, &mailbox, &args.target, "flagged", |client, target| {
        client.set_flags(target, &changes)
    })
}

fn flag_changes(args: &FlagArgs) -> FlagChanges {
    let mut changes = FlagChanges::default();
    if args.read {
        changes.add.push(Flag::Seen);
    }
    if args.unread {
        changes.remove.push(Flag::Seen);
    }
    if args.star {
        changes.add.push(Flag::Flagged);
    }
    if args.unstar {
        changes.remove.push(Flag::Flagged);
    }
    changes
}

/// Resolves the targets, applies `operation` once to the whole set, and reports it.
pub fn with_targets<F>(
    ctx: &AppContext,
    mailbox: &str,
    target: &TargetArgs,
    action: &str,
    operation: F,
) -> AppResult<()>
where
    F: FnOnce(&mut MailClient<BridgeImap>, &Selection) -> AppResult<()>,
{
    validate(target)?;

    let mut client = ctx.connect_imap()?;
    let result = apply(&mut client, mailbox, target, action, operation);
    let logout = client.logout();
    let result = result?;
    logout?;

    let text = if result.count == 0 {
        format!("no messages in {mailbox} match")
    } else {
        format!("{} {} message(s) in {mailbox}: {}", result.action, result.count, result.ids)
    };
    ctx.output.emit(&text, &result)
}

/// Rejects bad ids before a connection is opened.
fn validate(target: &TargetArgs) -> AppResult<()> {
    if !target.ids.is_empty() {
        sequence::build(&target.ids)?;
        return Ok(());
    }

    match target.query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => Ok(()),
        _ => Err(AppError::InvalidInput(
            "provide message ids or --query".to_string(),
        )),
    }
}

fn apply<S, F>(
    client: &mut MailClient<S>,
    mailbox: &str,
    target: &TargetArgs,
    action: &str,
    operation: F,
) -> AppResult<BatchResult>
where
    S: ImapSession,
    F: FnOnce(&mut MailClient<S>, &Selection) -> AppResult<()>,
{
    let selection = client.resolve_targets(mailbox, &target.ids, target.query.as_deref())?;
    let Some(selection) = selection else {
        return Ok(BatchResult {
            mailbox: mailbox.to_string(),
            action: action.to_string(),
            ids: String::new(),
            count: 0,
        });
    };

    operation(client, &selection)?;
    Ok(BatchResult {
        mailbox: mailbox.to_string(),
        action: action.to_string(),
        ids: selection.set.to_string(),
        count: selection.set.len(),
    })
}
