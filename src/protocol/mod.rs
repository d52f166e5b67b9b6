//! Seams between mail orchestration and the wire.

pub mod imap;
pub mod smtp;

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::error::AppResult;
use crate::mail::compose::ComposedMessage;
use crate::mail::search::SearchPredicate;
use crate::mail::sequence::SequenceSet;
use crate::mail::structure::{MimeNode, PartPath};

pub use self::imap::BridgeImap;
pub use self::smtp::BridgeSmtp;

/// An authenticated IMAP session. Message numbers are sequence numbers of the
/// currently selected mailbox.
pub trait ImapSession {
    fn select(&mut self, mailbox: &str) -> AppResult<MailboxStatus>;
    fn list_mailboxes(&mut self) -> AppResult<Vec<MailboxInfo>>;
    fn create_mailbox(&mut self, name: &str) -> AppResult<()>;
    fn delete_mailbox(&mut self, name: &str) -> AppResult<()>;
    fn fetch(&mut self, set: &SequenceSet, items: &FetchItems) -> AppResult<Vec<FetchedMessage>>;
    fn search(&mut self, predicate: &SearchPredicate) -> AppResult<Vec<u32>>;
    fn store(&mut self, set: &SequenceSet, action: StoreAction, flags: &[Flag]) -> AppResult<()>;
    fn copy(&mut self, set: &SequenceSet, mailbox: &str) -> AppResult<()>;
    fn expunge(&mut self) -> AppResult<()>;
    fn append(&mut self, mailbox: &str, message: &[u8], flags: &[Flag]) -> AppResult<()>;
    fn logout(&mut self) -> AppResult<()>;
}

pub trait SmtpSession {
    fn send(&mut self, message: &ComposedMessage) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
pub struct MailboxStatus {
    pub messages: u32,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct MailboxInfo {
    pub name: String,
    pub delimiter: Option<String>,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Flag {
    Seen,
    Answered,
    Flagged,
    Deleted,
    Draft,
    Custom(String),
}

impl Flag {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "\\seen" => Self::Seen,
            "\\answered" => Self::Answered,
            "\\flagged" => Self::Flagged,
            "\\deleted" => Self::Deleted,
            "\\draft" => Self::Draft,
            _ => Self::Custom(raw.to_string()),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seen => f.write_str("\\Seen"),
            Self::Answered => f.write_str("\\Answered"),
            Self::Flagged => f.write_str("\\Flagged"),
            Self::Deleted => f.write_str("\\Deleted"),
            Self::Draft => f.write_str("\\Draft"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

impl Serialize for Flag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StoreAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct Address {
    pub name: Option<String>,
    pub email: String,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct Envelope {
    pub date: Option<String>,
    pub subject: Option<String>,
    pub from: Vec<Address>,
    pub reply_to: Vec<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BodySection {
    Full,
    Part(PartPath),
}

/// Data items requested by a FETCH. Body sections are always fetched with `PEEK`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FetchItems {
    pub uid: bool,
    pub flags: bool,
    pub envelope: bool,
    pub internal_date: bool,
    pub size: bool,
    pub body_structure: bool,
    pub section: Option<BodySection>,
}

impl FetchItems {
    pub fn summary() -> Self {
        Self {
            uid: true,
            flags: true,
            envelope: true,
            internal_date: true,
            ..Self::default()
        }
    }

    pub fn full_message() -> Self {
        Self {
            size: true,
            section: Some(BodySection::Full),
            ..Self::summary()
        }
    }

    pub fn structure() -> Self {
        Self {
            uid: true,
            body_structure: true,
            ..Self::default()
        }
    }

    pub fn part(path: PartPath) -> Self {
        Self {
            section: Some(BodySection::Part(path)),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchedMessage {
    pub seq: u32,
    pub uid: Option<u32>,
    pub flags: Vec<Flag>,
    pub envelope: Option<Envelope>,
    pub internal_date: Option<DateTime<FixedOffset>>,
    pub size: Option<u32>,
    pub body: Option<Vec<u8>>,
    pub structure: Option<MimeNode>,
}

impl FetchedMessage {
    pub fn has_flag(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_system_flags_case_insensitively() {
        assert_eq!(Flag::parse("\\SEEN"), Flag::Seen);
        assert_eq!(Flag::parse("$Forwarded"), Flag::Custom("$Forwarded".to_string()));
        assert_eq!(Flag::Flagged.to_string(), "\\Flagged");
    }

    #[test]
    fn formats_addresses() {
        let named = Address {
            name: Some("Ada".to_string()),
            email: "ada@example.com".to_string(),
        };
        assert_eq!(named.to_string(), "Ada <ada@example.com>");
        let bare = Address {
            name: None,
            email: "bob@example.com".to_string(),
        };
        assert_eq!(bare.to_string(), "bob@example.com");
    }
}
