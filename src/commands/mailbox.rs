use serde::Serialize;

use crate::cli::MailboxCommand;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct MailboxChange {
    name: String,
    action: &'static str,
}

pub async fn run(ctx: &AppContext, command: MailboxCommand) -> AppResult<()> {
    match command {
        MailboxCommand::List => {
            let mut client = ctx.connect_imap()?;
            let mailboxes = client.mailboxes()?;
            client.logout()?;

            let rows = mailboxes
                .iter()
                .map(|mailbox| vec![mailbox.name.clone(), mailbox.attributes.join(" ")])
                .collect::<Vec<_>>();
            ctx.output
                .emit_table(&["MAILBOX", "ATTRIBUTES"], &rows, "0 mailboxes", &mailboxes)
        }
        MailboxCommand::Create(args) => {
            let name = mailbox_name(&args.name)?;
            let mut client = ctx.connect_imap()?;
            client.create_mailbox(&name)?;
            client.logout()?;
            emit_change(ctx, name, "created")
        }
        MailboxCommand::Delete(args) => {
            let name = mailbox_name(&args.name)?;
            if name.eq_ignore_ascii_case("INBOX") {
                return Err(AppError::InvalidInput(
                    "INBOX cannot be deleted".to_string(),
                ));
            }
            let mut client = ctx.connect_imap()?;
            client.delete_mailbox(&name)?;
            client.logout()?;
            emit_change(ctx, name, "deleted")
        }
    }
}

fn mailbox_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput(
            "mailbox name must not be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn emit_change(ctx: &AppContext, name: String, action: &'static str) -> AppResult<()> {
    let change = MailboxChange { name, action };
    let text = format!("{} mailbox {}", change.action, change.name);
    ctx.output.emit(&text, &change)
}
