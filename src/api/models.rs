use mail_parser::{HeaderValue, MessageParser};
use serde::Serialize;

use crate::mail::body::{self, ResolvedBody};
use crate::mail::structure::PartPath;
use crate::protocol::{FetchedMessage, Flag};

/// One row of a mailbox listing.
#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub uid: Option<u32>,
    pub seq: u32,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub date: Option<String>,
    pub seen: bool,
    pub flagged: bool,
}

impl MessageSummary {
    pub fn from_fetch(fetch: &FetchedMessage) -> Self {
        let envelope = fetch.envelope.clone().unwrap_or_default();
        let from = envelope
            .from
            .first()
            .map(|address| {
                address
                    .name
                    .clone()
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| address.email.clone())
            })
            .unwrap_or_default();

        Self {
            uid: fetch.uid,
            seq: fetch.seq,
            from,
            to: envelope.to.iter().map(ToString::to_string).collect(),
            subject: envelope.subject.unwrap_or_default(),
            date: fetch
                .internal_date
                .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
                .or(envelope.date),
            seen: fetch.has_flag(&Flag::Seen),
            flagged: fetch.has_flag(&Flag::Flagged),
        }
    }
}

/// A fully fetched message.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub uid: Option<u32>,
    pub seq: u32,
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
    pub date: Option<String>,
    pub from: String,
    pub reply_to: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub flags: Vec<Flag>,
    pub size: Option<u32>,
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl Message {
    pub fn from_fetch(fetch: FetchedMessage) -> Self {
        let envelope = fetch.envelope.unwrap_or_default();
        let raw = fetch.body.unwrap_or_default();

        Self {
            uid: fetch.uid,
            seq: fetch.seq,
            references: header_references(&raw),
            message_id: envelope.message_id,
            in_reply_to: envelope.in_reply_to,
            date: envelope.date.or_else(|| {
                fetch
                    .internal_date
                    .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
            }),
            from: envelope
                .from
                .first()
                .map(ToString::to_string)
                .unwrap_or_default(),
            reply_to: envelope.reply_to.first().map(ToString::to_string),
            to: envelope.to.iter().map(ToString::to_string).collect(),
            cc: envelope.cc.iter().map(ToString::to_string).collect(),
            subject: envelope.subject.unwrap_or_default(),
            flags: fetch.flags,
            size: fetch.size,
            raw,
        }
    }

    pub fn body(&self) -> ResolvedBody {
        body::resolve(&self.raw)
    }

    /// Raw header block, up to the first blank line.
    pub fn raw_headers(&self) -> String {
        let text = String::from_utf8_lossy(&self.raw);
        let end = text
            .find("\r\n\r\n")
            .or_else(|| text.find("\n\n"))
            .unwrap_or(text.len());
        text[..end].to_string()
    }
}

fn header_references(raw: &[u8]) -> Option<String> {
    let message = MessageParser::default().parse(raw)?;
    let ids = match message.references() {
        HeaderValue::Text(id) => vec![format!("<{id}>")],
        HeaderValue::TextList(ids) => ids.iter().map(|id| format!("<{id}>")).collect(),
        _ => return None,
    };
    (!ids.is_empty()).then(|| ids.join(" "))
}

#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    pub index: usize,
    pub part_path: PartPath,
    pub filename: String,
    pub content_type: String,
    pub size: Option<u64>,
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub mailbox: String,
    pub action: String,
    pub ids: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelInfo {
    pub name: String,
    pub full_path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendOutcome {
    Sent,
    DuplicateSuppressed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendResult {
    pub outcome: SendOutcome,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub in_reply_to: Option<String>,
}
