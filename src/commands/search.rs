use serde::Serialize;

use crate::api::models::MessageSummary;
use crate::cli::SearchArgs;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::mail::search::{Combinator, SearchOptions};

use super::list::{SUMMARY_HEADER, summary_rows};

#[derive(Debug, Serialize)]
struct SearchResults {
    mailbox: String,
    count: usize,
    messages: Vec<MessageSummary>,
}

pub async fn run(ctx: &AppContext, args: SearchArgs) -> AppResult<()> {
    let mailbox = ctx.mailbox(args.mailbox.as_deref());
    let limit = args.limit;
    let options = search_options(args);

    let mut client = ctx.connect_imap()?;
    let messages = client.search(&mailbox, &options, limit)?;
    client.logout()?;

    let rows = summary_rows(&messages);
    let empty = format!("no messages in {mailbox} match");
    let results = SearchResults {
        mailbox,
        count: messages.len(),
        messages,
    };
    ctx.output
        .emit_table(SUMMARY_HEADER, &rows, &empty, &results)
}

fn search_options(args: SearchArgs) -> SearchOptions {
    SearchOptions {
        query: args.query,
        from: args.from,
        to: args.to,
        subject: args.subject,
        body: args.body,
        since: args.since,
        before: args.before,
        has_attachments: args.has_attachments,
        larger_than: args.larger_than,
        smaller_than: args.smaller_than,
        combinator: if args.or {
            Combinator::Or
        } else {
            Combinator::And
        },
        negate: args.not,
    }
}
