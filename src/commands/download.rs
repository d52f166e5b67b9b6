use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::api::models::Attachment;
use crate::cli::DownloadArgs;
use crate::context::AppContext;
use crate::error::AppResult;

#[derive(Debug, Serialize)]
struct DownloadResult {
    #[serde(flatten)]
    attachment: Attachment,
    path: String,
}

pub async fn run(ctx: &AppContext, args: DownloadArgs) -> AppResult<()> {
    let mailbox = ctx.mailbox(args.mailbox.as_deref());
    let mut client = ctx.connect_imap()?;
    let mut attachment = client.download_attachment(&mailbox, &args.id, args.index)?;
    client.logout()?;

    let path = args
        .out
        .unwrap_or_else(|| PathBuf::from(safe_filename(&attachment.filename)));
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, attachment.data.take().unwrap_or_default())?;

    let result = DownloadResult {
        attachment,
        path: path.display().to_string(),
    };
    let text = format!(
        "saved {} ({} bytes) to {}",
        result.attachment.filename,
        result.attachment.size.unwrap_or_default(),
        result.path
    );
    ctx.output.emit(&text, &result)
}

/// Keeps only the final path component of a sender-supplied filename.
fn safe_filename(name: &str) -> String {
    let base = Path::new(name.trim())
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned = base
        .chars()
        .filter(|ch| !ch.is_control() && *ch != '/' && *ch != '\\')
        .collect::<String>();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "attachment".to_string()
    } else {
        cleaned
    }
}
