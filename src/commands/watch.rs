use std::collections::HashSet;
use std::future::{self, Future};
use std::io;
use std::pin::Pin;
use std::process::Command;
use std::time::Duration;

use tokio::task::block_in_place;
use tracing::{debug, info, warn};

use crate::api::models::MessageSummary;
use crate::api::{ListOptions, MailClient};
use crate::cli::WatchArgs;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::protocol::BridgeImap;

/// Newest messages examined per poll.
const POLL_WINDOW: u32 = 50;

/// Tracks which messages have been reported. The first poll only records a baseline.
///
/// Only identities from the latest poll window are kept.
#[derive(Debug, Default)]
struct Watcher {
    seen: HashSet<u32>,
    primed: bool,
}

impl Watcher {
    fn observe(&mut self, messages: Vec<MessageSummary>) -> Vec<MessageSummary> {
        let current = messages
            .iter()
            .map(|message| message.uid.unwrap_or(message.seq))
            .collect::<HashSet<_>>();
        let mut fresh = messages
            .into_iter()
            .filter(|message| !self.seen.contains(&message.uid.unwrap_or(message.seq)))
            .collect::<Vec<_>>();
        self.seen = current;

        if !self.primed {
            self.primed = true;
            return Vec::new();
        }

        fresh.sort_by_key(|message| message.seq);
        fresh
    }
}

pub async fn run(ctx: &AppContext, args: WatchArgs) -> AppResult<()> {
    if args.interval == 0 {
        return Err(AppError::InvalidInput(
            "--interval must be at least 1 second".to_string(),
        ));
    }

    let mailbox = ctx.mailbox(args.mailbox.as_deref());
    let options = ListOptions {
        limit: POLL_WINDOW,
        offset: 0,
        unread_only: args.unread,
    };
    let interval = Duration::from_secs(args.interval);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    if poll_once(shutdown.as_mut()).await? {
        info!("interrupted");
        return Ok(());
    }

    let mut client = Some(block_in_place(|| ctx.connect_imap())?);
    let mut watcher = Watcher::default();
    info!(%mailbox, interval = args.interval, "watching for new messages");

    loop {
        let session = match client.take() {
            Some(session) => Some(session),
            None => match block_in_place(|| ctx.connect_imap()) {
                Ok(session) => Some(session),
                Err(err) => {
                    warn!(%err, "reconnect failed");
                    None
                }
            },
        };

        if let Some(mut session) = session {
            match block_in_place(|| session.list(&mailbox, options)) {
                Ok(messages) => {
                    client = Some(session);
                    let fresh = watcher.observe(messages);
                    debug!(new = fresh.len(), "poll complete");
                    for message in &fresh {
                        report(ctx, message, args.exec.as_deref())?;
                    }
                    if args.once && !fresh.is_empty() {
                        break;
                    }
                }
                Err(err) => warn!(%err, "poll failed; reconnecting next round"),
            }
        }

        tokio::select! {
            result = &mut shutdown => {
                result?;
                info!("interrupted");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    close(client)
}

/// Polls `signal` once so its handler is installed. Returns whether it already fired.
async fn poll_once<F>(signal: Pin<&mut F>) -> AppResult<bool>
where
    F: Future<Output = io::Result<()>>,
{
    tokio::select! {
        biased;
        result = signal => {
            result?;
            Ok(true)
        }
        () = future::ready(()) => Ok(false),
    }
}

fn close(client: Option<MailClient<BridgeImap>>) -> AppResult<()> {
    match client {
        Some(client) => block_in_place(|| client.logout()),
        None => Ok(()),
    }
}

fn report(ctx: &AppContext, message: &MessageSummary, exec: Option<&str>) -> AppResult<()> {
    let text = format!(
        "new message {}: {} | {}",
        message.seq, message.from, message.subject
    );
    ctx.output.emit(&text, message)?;

    if let Some(template) = exec {
        let command = expand_command(template, message.seq);
        let status = block_in_place(|| Command::new("sh").arg("-c").arg(&command).status());
        match status {
            Ok(status) if status.success() => debug!(%command, "hook finished"),
            Ok(status) => warn!(%command, %status, "hook exited unsuccessfully"),
            Err(err) => warn!(%command, %err, "hook failed to start"),
        }
    }

    Ok(())
}

fn expand_command(template: &str, seq: u32) -> String {
    template.replace("{}", &seq.to_string())
}
