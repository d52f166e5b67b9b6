use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "pmail",
    version,
    about = "Command line mail client for a local IMAP/SMTP bridge"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "default",
        help = "Profile name to use"
    )]
    pub profile: String,
    #[arg(long, global = true, help = "Emit JSON output")]
    pub json: bool,
    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Verbose logging")]
    pub verbose: u8,
    #[arg(
        short = 'c',
        long,
        global = true,
        help = "Settings file to use instead of the profile file"
    )]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store or clear bridge credentials
    Auth(AuthArgs),
    /// Show or change profile settings
    Config(ConfigArgs),
    /// List messages in a mailbox
    List(ListArgs),
    /// Read a message
    Read(ReadArgs),
    /// Compose and send a message
    Send(SendArgs),
    /// Reply to a message
    Reply(ReplyArgs),
    /// Forward a message
    Forward(ForwardArgs),
    /// Search a mailbox
    Search(SearchArgs),
    /// Delete messages (to trash unless --permanent)
    Delete(DeleteArgs),
    /// Move messages to another mailbox
    Move(MoveArgs),
    /// Set or clear read and star flags
    Flag(FlagArgs),
    /// Download an attachment
    Download(DownloadArgs),
    /// Manage drafts
    Draft(DraftArgs),
    /// Manage labels
    Label(LabelArgs),
    /// Manage mailboxes
    Mailbox(MailboxArgs),
    /// Poll a mailbox for new messages
    Watch(WatchArgs),
    /// Print the command table as JSON
    Schema,
}

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    Login(LoginArgs),
    Status,
    Logout,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(long, help = "Bridge username (defaults to the profile email)")]
    pub username: Option<String>,
    #[arg(long, help = "Read the bridge password from stdin")]
    pub password_stdin: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    Show,
    Set(ConfigSetArgs),
    Path,
    /// Log in to the bridge over IMAP and SMTP
    Validate,
    /// Run setup checks and report each result
    Doctor,
}

#[derive(Debug, Args)]
pub struct ConfigSetArgs {
    #[arg(help = "Setting key, e.g. email or imap_port")]
    pub key: String,
    #[arg(help = "New value; empty clears the setting")]
    pub value: String,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(short = 'm', long, help = "Mailbox name (defaults to the profile mailbox)")]
    pub mailbox: Option<String>,
    #[arg(short = 'n', long, help = "Maximum messages to return")]
    pub limit: Option<u32>,
    #[arg(long, default_value_t = 0, help = "Skip the newest N messages")]
    pub offset: u32,
    #[arg(short = 'p', long, help = "Page number, 1-based; overrides --offset")]
    pub page: Option<u32>,
    #[arg(long, help = "Only show unread messages")]
    pub unread: bool,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    #[arg(help = "Message sequence number")]
    pub id: String,
    #[arg(short = 'm', long, help = "Mailbox name")]
    pub mailbox: Option<String>,
    #[arg(long, help = "Print the raw message")]
    pub raw: bool,
    #[arg(long, help = "Include all headers")]
    pub headers: bool,
    #[arg(long, help = "Print the HTML body instead of plain text")]
    pub html: bool,
    #[arg(long, help = "List attachments")]
    pub attachments: bool,
}

#[derive(Debug, Default, Args)]
pub struct BodyArgs {
    #[arg(short = 'b', long, help = "Inline body text")]
    pub body: Option<String>,
    #[arg(long, help = "Read body from file")]
    pub body_file: Option<PathBuf>,
    #[arg(long, help = "Read body from stdin")]
    pub stdin: bool,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    #[arg(short = 't', long, value_delimiter = ',', num_args = 1.., help = "Recipient addresses")]
    pub to: Vec<String>,
    #[arg(long, value_delimiter = ',', num_args = 1.., help = "CC addresses")]
    pub cc: Vec<String>,
    #[arg(long, value_delimiter = ',', num_args = 1.., help = "BCC addresses")]
    pub bcc: Vec<String>,
    #[arg(short = 's', long, visible_alias = "subj", help = "Email subject")]
    pub subject: Option<String>,
    #[command(flatten)]
    pub body: BodyArgs,
    #[arg(short = 'a', long, action = ArgAction::Append, help = "Attach file (repeatable)")]
    pub attach: Vec<PathBuf>,
    #[arg(long, help = "Unique key that suppresses duplicate sends")]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReplyArgs {
    #[arg(help = "Message sequence number to reply to")]
    pub id: String,
    #[arg(short = 'm', long, help = "Mailbox holding the message")]
    pub mailbox: Option<String>,
    #[arg(long, help = "Reply to all recipients")]
    pub all: bool,
    #[command(flatten)]
    pub body: BodyArgs,
    #[arg(short = 'a', long, action = ArgAction::Append, help = "Attach file (repeatable)")]
    pub attach: Vec<PathBuf>,
    #[arg(long, help = "Unique key that suppresses duplicate sends")]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Args)]
pub struct ForwardArgs {
    #[arg(help = "Message sequence number to forward")]
    pub id: String,
    #[arg(short = 'm', long, help = "Mailbox holding the message")]
    pub mailbox: Option<String>,
    #[arg(short = 't', long, required = true, value_delimiter = ',', num_args = 1.., help = "Recipient addresses")]
    pub to: Vec<String>,
    #[arg(long, value_delimiter = ',', num_args = 1.., help = "CC addresses")]
    pub cc: Vec<String>,
    #[command(flatten)]
    pub body: BodyArgs,
    #[arg(short = 'a', long, action = ArgAction::Append, help = "Attach file (repeatable)")]
    pub attach: Vec<PathBuf>,
    #[arg(long, help = "Unique key that suppresses duplicate sends")]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(help = "Free text searched in message bodies")]
    pub query: Option<String>,
    #[arg(short = 'm', long, help = "Mailbox to search")]
    pub mailbox: Option<String>,
    #[arg(long, help = "Filter by sender")]
    pub from: Option<String>,
    #[arg(long, help = "Filter by recipient")]
    pub to: Option<String>,
    #[arg(long, help = "Filter by subject")]
    pub subject: Option<String>,
    #[arg(long, help = "Search in message body")]
    pub body: Option<String>,
    #[arg(long, help = "Messages since date (YYYY-MM-DD)")]
    pub since: Option<String>,
    #[arg(long, help = "Messages before date (YYYY-MM-DD)")]
    pub before: Option<String>,
    #[arg(long, help = "Only messages with attachments")]
    pub has_attachments: bool,
    #[arg(long, help = "Messages larger than size, e.g. 1M or 500K")]
    pub larger_than: Option<String>,
    #[arg(long, help = "Messages smaller than size, e.g. 10M or 1K")]
    pub smaller_than: Option<String>,
    #[arg(long, help = "Combine filters with OR instead of AND")]
    pub or: bool,
    #[arg(long, help = "Negate the whole search")]
    pub not: bool,
    #[arg(short = 'n', long, help = "Maximum results to show")]
    pub limit: Option<usize>,
}

/// Explicit sequence numbers or a query selecting messages.
#[derive(Debug, Args)]
pub struct TargetArgs {
    #[arg(help = "Message sequence numbers")]
    pub ids: Vec<String>,
    #[arg(long, help = "Select messages matching a query, e.g. 'from:news@example.com'")]
    pub query: Option<String>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[arg(short = 'm', long, help = "Mailbox to operate on")]
    pub mailbox: Option<String>,
    #[arg(long, help = "Skip trash and expunge permanently")]
    pub permanent: bool,
}

#[derive(Debug, Args)]
pub struct MoveArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[arg(short = 'm', long, help = "Source mailbox")]
    pub mailbox: Option<String>,
    #[arg(short = 'd', long, help = "Destination mailbox")]
    pub destination: String,
}

#[derive(Debug, Args)]
pub struct FlagArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[arg(short = 'm', long, help = "Mailbox to operate on")]
    pub mailbox: Option<String>,
    #[arg(long, conflicts_with = "unread", help = "Mark as read")]
    pub read: bool,
    #[arg(long, help = "Mark as unread")]
    pub unread: bool,
    #[arg(long, conflicts_with = "unstar", help = "Add star")]
    pub star: bool,
    #[arg(long, help = "Remove star")]
    pub unstar: bool,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    #[arg(help = "Message sequence number")]
    pub id: String,
    #[arg(help = "Attachment index, 0-based, as shown by `read --attachments`")]
    pub index: usize,
    #[arg(short = 'm', long, help = "Mailbox name")]
    pub mailbox: Option<String>,
    #[arg(short = 'o', long, help = "Output path (defaults to the attachment filename)")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DraftArgs {
    #[command(subcommand)]
    pub command: DraftCommand,
}

#[derive(Debug, Subcommand)]
pub enum DraftCommand {
    List(DraftListArgs),
    Create(DraftCreateArgs),
    Edit(DraftEditArgs),
    Delete(DraftDeleteArgs),
}

#[derive(Debug, Args)]
pub struct DraftListArgs {
    #[arg(short = 'n', long, default_value_t = 20, help = "Maximum drafts to return")]
    pub limit: u32,
}

#[derive(Debug, Args)]
pub struct DraftCreateArgs {
    #[arg(short = 't', long, value_delimiter = ',', num_args = 1.., help = "Recipient addresses")]
    pub to: Vec<String>,
    #[arg(long, value_delimiter = ',', num_args = 1.., help = "CC addresses")]
    pub cc: Vec<String>,
    #[arg(short = 's', long, help = "Subject line")]
    pub subject: Option<String>,
    #[command(flatten)]
    pub body: BodyArgs,
    #[arg(short = 'a', long, action = ArgAction::Append, help = "Attach file (repeatable)")]
    pub attach: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DraftEditArgs {
    #[arg(help = "Draft sequence number")]
    pub id: String,
    #[arg(short = 't', long, value_delimiter = ',', num_args = 1.., help = "Replace recipients")]
    pub to: Vec<String>,
    #[arg(long, value_delimiter = ',', num_args = 1.., help = "Replace CC addresses")]
    pub cc: Vec<String>,
    #[arg(short = 's', long, help = "Replace subject")]
    pub subject: Option<String>,
    #[command(flatten)]
    pub body: BodyArgs,
    #[arg(short = 'a', long, action = ArgAction::Append, help = "Attach file (repeatable)")]
    pub attach: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DraftDeleteArgs {
    #[arg(required = true, num_args = 1.., help = "Draft sequence numbers")]
    pub ids: Vec<String>,
}

#[derive(Debug, Args)]
pub struct LabelArgs {
    #[command(subcommand)]
    pub command: LabelCommand,
}

#[derive(Debug, Subcommand)]
pub enum LabelCommand {
    #[command(visible_alias = "ls")]
    List,
    Add(LabelAddArgs),
    #[command(visible_alias = "rm")]
    Remove(LabelRemoveArgs),
}

#[derive(Debug, Args)]
pub struct LabelAddArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[arg(short = 'l', long, help = "Label name")]
    pub label: String,
    #[arg(short = 'm', long, help = "Source mailbox")]
    pub mailbox: Option<String>,
}

#[derive(Debug, Args)]
pub struct LabelRemoveArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[arg(short = 'l', long, help = "Label name; ids are positions inside the label")]
    pub label: String,
}

#[derive(Debug, Args)]
pub struct MailboxArgs {
    #[command(subcommand)]
    pub command: MailboxCommand,
}

#[derive(Debug, Subcommand)]
pub enum MailboxCommand {
    List,
    Create(MailboxNameArgs),
    Delete(MailboxNameArgs),
}

#[derive(Debug, Args)]
pub struct MailboxNameArgs {
    #[arg(help = "Mailbox name")]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[arg(short = 'm', long, help = "Mailbox to watch")]
    pub mailbox: Option<String>,
    #[arg(short = 'i', long, default_value_t = 30, help = "Poll interval in seconds")]
    pub interval: u64,
    #[arg(long, help = "Only report unread messages")]
    pub unread: bool,
    #[arg(
        short = 'e',
        long,
        help = "Command to run per new message; {} is replaced by its sequence number"
    )]
    pub exec: Option<String>,
    #[arg(long, help = "Exit after the first batch of new messages")]
    pub once: bool,
}
