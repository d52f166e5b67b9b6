use serde::Serialize;

use crate::api::ListOptions;
use crate::api::models::MessageSummary;
use crate::cli::ListArgs;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::output::text::truncate;

pub const SUMMARY_HEADER: &[&str] = &["ID", "", "DATE", "FROM", "SUBJECT"];

#[derive(Debug, Serialize)]
pub struct Listing {
    pub mailbox: String,
    pub count: usize,
    pub messages: Vec<MessageSummary>,
}

pub async fn run(ctx: &AppContext, args: ListArgs) -> AppResult<()> {
    let limit = args.limit.unwrap_or_else(|| ctx.settings.limit());
    if limit == 0 {
        return Err(AppError::InvalidInput(
            "--limit must be greater than 0".to_string(),
        ));
    }

    let offset = page_offset(args.page, args.offset, limit)?;
    let mailbox = ctx.mailbox(args.mailbox.as_deref());

    let mut client = ctx.connect_imap()?;
    let messages = client.list(
        &mailbox,
        ListOptions {
            limit,
            offset,
            unread_only: args.unread,
        },
    )?;
    client.logout()?;

    let rows = summary_rows(&messages);
    let empty = format!("0 messages in {mailbox}");
    let listing = Listing {
        mailbox,
        count: messages.len(),
        messages,
    };
    ctx.output
        .emit_table(SUMMARY_HEADER, &rows, &empty, &listing)
}

/// `--page` is 1-based and takes precedence over `--offset`.
fn page_offset(page: Option<u32>, offset: u32, limit: u32) -> AppResult<u32> {
    match page {
        None => Ok(offset),
        Some(0) => Err(AppError::InvalidInput(
            "--page is 1-based; use --page 1 for the newest messages".to_string(),
        )),
        Some(page) => (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| AppError::InvalidInput(format!("--page {page} is out of range"))),
    }
}

pub fn summary_rows(messages: &[MessageSummary]) -> Vec<Vec<String>> {
    messages
        .iter()
        .map(|message| {
            vec![
                message.seq.to_string(),
                status_marker(message),
                message.date.clone().unwrap_or_default(),
                truncate(non_empty(&message.from, "(unknown sender)"), 28),
                truncate(non_empty(&message.subject, "(no subject)"), 72),
            ]
        })
        .collect()
}

fn status_marker(message: &MessageSummary) -> String {
    let unread = if message.seen { ' ' } else { 'N' };
    let flagged = if message.flagged { '*' } else { ' ' };
    format!("{unread}{flagged}")
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
