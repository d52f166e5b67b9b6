use crate::cli::{LabelAddArgs, LabelCommand, LabelRemoveArgs};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};

use super::batch::with_targets;

pub async fn run(ctx: &AppContext, command: LabelCommand) -> AppResult<()> {
    match command {
        LabelCommand::List => {
            let mut client = ctx.connect_imap()?;
            let labels = client.labels()?;
            client.logout()?;

            let rows = labels
                .iter()
                .enumerate()
                .map(|(index, label)| {
                    vec![
                        format!("{}.", index + 1),
                        label.name.clone(),
                        label.full_path.clone(),
                    ]
                })
                .collect::<Vec<_>>();
            ctx.output
                .emit_table(&["", "LABEL", "FOLDER"], &rows, "0 labels", &labels)
        }
        LabelCommand::Add(args) => add(ctx, args),
        LabelCommand::Remove(args) => remove(ctx, args),
    }
}

fn add(ctx: &AppContext, args: LabelAddArgs) -> AppResult<()> {
    let label = label_name(&args.label)?;
    let mailbox = ctx.mailbox(args.mailbox.as_deref());
    let action = format!("labeled {label}");
    with_targets(ctx, &mailbox, &args.target, &action, |client, target| {
        client.add_label(target, label).map(|_| ())
    })
}

/// Ids are sequence numbers inside the label folder.
fn remove(ctx: &AppContext, args: LabelRemoveArgs) -> AppResult<()> {
    let label = label_name(&args.label)?;
    let folder = format!("{}{label}", ctx.settings.label_prefix());
    let action = format!("unlabeled {label}");
    with_targets(ctx, &folder, &args.target, &action, |client, target| {
        client.purge(target)
    })
}

fn label_name(raw: &str) -> AppResult<&str> {
    let label = raw.trim();
    if label.is_empty() {
        return Err(AppError::InvalidInput("--label must not be empty".to_string()));
    }
    Ok(label)
}
