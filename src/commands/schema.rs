use serde::Serialize;

use crate::context::AppContext;
use crate::error::AppResult;

#[derive(Debug, Serialize)]
pub struct CommandSpec {
    pub name: &'static str,
    pub about: &'static str,
    pub subcommands: &'static [&'static str],
    pub batch: bool,
}

const fn command(name: &'static str, about: &'static str) -> CommandSpec {
    CommandSpec {
        name,
        about,
        subcommands: &[],
        batch: false,
    }
}

/// Every top-level command, in the order `pmail --help` lists them.
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        subcommands: &["login", "status", "logout"],
        ..command("auth", "Store or clear bridge credentials")
    },
    CommandSpec {
        subcommands: &["show", "set", "path", "validate", "doctor"],
        ..command("config", "Show or change profile settings")
    },
    command("list", "List messages in a mailbox"),
    command("read", "Read a message"),
    command("send", "Compose and send a message"),
    command("reply", "Reply to a message"),
    command("forward", "Forward a message"),
    command("search", "Search a mailbox"),
    CommandSpec {
        batch: true,
        ..command("delete", "Delete messages (to trash unless --permanent)")
    },
    CommandSpec {
        batch: true,
        ..command("move", "Move messages to another mailbox")
    },
    CommandSpec {
        batch: true,
        ..command("flag", "Set or clear read and star flags")
    },
    command("download", "Download an attachment"),
    CommandSpec {
        subcommands: &["list", "create", "edit", "delete"],
        ..command("draft", "Manage drafts")
    },
    CommandSpec {
        subcommands: &["list", "add", "remove"],
        batch: true,
        ..command("label", "Manage labels")
    },
    CommandSpec {
        subcommands: &["list", "create", "delete"],
        ..command("mailbox", "Manage mailboxes")
    },
    command("watch", "Poll a mailbox for new messages"),
    command("schema", "Print the command table as JSON"),
];

pub async fn run(ctx: &AppContext) -> AppResult<()> {
    let text = serde_json::to_string_pretty(COMMANDS)?;
    ctx.output.emit(&text, &COMMANDS)
}
