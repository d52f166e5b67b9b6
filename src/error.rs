use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid message identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("message not found: {0}")]
    MessageNotFound(String),
    #[error("attachment not found: {0}")]
    AttachmentNotFound(String),
    #[error("attachment unreadable: {path}: {source}")]
    AttachmentUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn protocol(operation: impl AsRef<str>, err: impl std::fmt::Display) -> Self {
        Self::Protocol(format!("{}: {err}", operation.as_ref()))
    }
}
