use std::borrow::Cow;
use std::net::TcpStream;

use imap::types::{Fetch, Flag as ImapFlag};
use imap_proto::types::{BodyStructure, ContentEncoding, SectionPath};
use mail_parser::MessageParser;
use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::mail::search::SearchPredicate;
use crate::mail::sequence::SequenceSet;
use crate::mail::structure::{Disposition, MimeNode};

use super::{
    Address, BodySection, Envelope, FetchItems, FetchedMessage, Flag, ImapSession, MailboxInfo,
    MailboxStatus, StoreAction,
};

const SEARCH_DATE_FORMAT: &str = "%d-%b-%Y";

/// STARTTLS session against a local bridge.
pub struct BridgeImap {
    session: imap::Session<TlsStream<TcpStream>>,
}

#[derive(Debug, Clone)]
pub struct ImapEndpoint {
    pub host: String,
    pub port: u16,
    pub accept_invalid_certs: bool,
}

impl BridgeImap {
    pub fn connect(endpoint: &ImapEndpoint, username: &str, password: &str) -> AppResult<Self> {
        let tls = TlsConnector::builder()
            .danger_accept_invalid_certs(endpoint.accept_invalid_certs)
            .danger_accept_invalid_hostnames(endpoint.accept_invalid_certs)
            .build()
            .map_err(|err| AppError::protocol("imap tls setup", err))?;

        debug!(host = %endpoint.host, port = endpoint.port, "connecting to imap");
        let client = imap::connect_starttls(
            (endpoint.host.as_str(), endpoint.port),
            &endpoint.host,
            &tls,
        )
        .map_err(|err| AppError::protocol("imap connect", err))?;

        let session = client
            .login(username, password)
            .map_err(|(err, _client)| AppError::protocol("imap login", err))?;
        info!(username, "imap session established");

        Ok(Self { session })
    }
}

impl ImapSession for BridgeImap {
    fn select(&mut self, mailbox: &str) -> AppResult<MailboxStatus> {
        let selected = self
            .session
            .select(mailbox)
            .map_err(|err| AppError::protocol(format!("select {mailbox}"), err))?;
        Ok(MailboxStatus {
            messages: selected.exists,
        })
    }

    fn list_mailboxes(&mut self) -> AppResult<Vec<MailboxInfo>> {
        let names = self
            .session
            .list(Some(""), Some("*"))
            .map_err(|err| AppError::protocol("list mailboxes", err))?;

        Ok(names
            .iter()
            .map(|name| MailboxInfo {
                name: name.name().to_string(),
                delimiter: name.delimiter().map(str::to_string),
                attributes: name
                    .attributes()
                    .iter()
                    .map(|attribute| format!("{attribute:?}"))
                    .collect(),
            })
            .collect())
    }

    fn create_mailbox(&mut self, name: &str) -> AppResult<()> {
        self.session
            .create(name)
            .map_err(|err| AppError::protocol(format!("create mailbox {name}"), err))
    }

    fn delete_mailbox(&mut self, name: &str) -> AppResult<()> {
        self.session
            .delete(name)
            .map_err(|err| AppError::protocol(format!("delete mailbox {name}"), err))
    }

    fn fetch(&mut self, set: &SequenceSet, items: &FetchItems) -> AppResult<Vec<FetchedMessage>> {
        let query = render_fetch_items(items);
        debug!(set = %set, query = %query, "fetch");
        let fetches = self
            .session
            .fetch(set.to_string(), &query)
            .map_err(|err| AppError::protocol("fetch", err))?;

        Ok(fetches
            .iter()
            .map(|fetch| convert_fetch(fetch, items))
            .collect())
    }

    fn search(&mut self, predicate: &SearchPredicate) -> AppResult<Vec<u32>> {
        let query = render_query(predicate);
        let query = if query.is_ascii() {
            query
        } else {
            format!("CHARSET UTF-8 {query}")
        };
        debug!(query = %query, "search");

        let mut found = self
            .session
            .search(&query)
            .map_err(|err| AppError::protocol("search", err))?
            .into_iter()
            .collect::<Vec<_>>();
        found.sort_unstable();
        Ok(found)
    }

    fn store(&mut self, set: &SequenceSet, action: StoreAction, flags: &[Flag]) -> AppResult<()> {
        let sign = match action {
            StoreAction::Add => '+',
            StoreAction::Remove => '-',
        };
        let query = format!("{sign}FLAGS.SILENT ({})", join_flags(flags));
        debug!(set = %set, query = %query, "store");
        self.session
            .store(set.to_string(), &query)
            .map(|_| ())
            .map_err(|err| AppError::protocol("store", err))
    }

    fn copy(&mut self, set: &SequenceSet, mailbox: &str) -> AppResult<()> {
        debug!(set = %set, mailbox, "copy");
        self.session
            .copy(set.to_string(), mailbox)
            .map_err(|err| AppError::protocol(format!("copy to {mailbox}"), err))
    }

    fn expunge(&mut self) -> AppResult<()> {
        self.session
            .expunge()
            .map(|_| ())
            .map_err(|err| AppError::protocol("expunge", err))
    }

    fn append(&mut self, mailbox: &str, message: &[u8], flags: &[Flag]) -> AppResult<()> {
        let flags = flags.iter().map(to_imap_flag).collect::<Vec<_>>();
        debug!(mailbox, bytes = message.len(), "append");
        self.session
            .append_with_flags(mailbox, message, &flags)
            .map_err(|err| AppError::protocol(format!("append to {mailbox}"), err))
    }

    fn logout(&mut self) -> AppResult<()> {
        self.session
            .logout()
            .map_err(|err| AppError::protocol("logout", err))
    }
}

/// Renders a predicate as IMAP SEARCH keys.
///
/// Or nodes are folded right into binary `OR a (OR b c)` chains.
pub fn render_query(predicate: &SearchPredicate) -> String {
    match predicate {
        SearchPredicate::And(nodes) if nodes.is_empty() => "ALL".to_string(),
        SearchPredicate::And(nodes) => nodes
            .iter()
            .map(render_key)
            .collect::<Vec<_>>()
            .join(" "),
        other => render_key(other),
    }
}

fn render_key(predicate: &SearchPredicate) -> String {
    match predicate {
        SearchPredicate::Body(text) => format!("BODY {}", quote(text)),
        SearchPredicate::Header { key, value } => match key.to_ascii_lowercase().as_str() {
            "from" => format!("FROM {}", quote(value)),
            "to" => format!("TO {}", quote(value)),
            "cc" => format!("CC {}", quote(value)),
            "subject" => format!("SUBJECT {}", quote(value)),
            _ => format!("HEADER {} {}", quote(key), quote(value)),
        },
        SearchPredicate::SizeAbove(size) => format!("LARGER {size}"),
        SearchPredicate::SizeBelow(size) => format!("SMALLER {size}"),
        SearchPredicate::DateSince(date) => format!("SINCE {}", date.format(SEARCH_DATE_FORMAT)),
        SearchPredicate::DateBefore(date) => {
            format!("BEFORE {}", date.format(SEARCH_DATE_FORMAT))
        }
        SearchPredicate::And(nodes) => match nodes.as_slice() {
            [] => "ALL".to_string(),
            [single] => render_key(single),
            _ => format!("({})", render_query(predicate)),
        },
        SearchPredicate::Or(nodes) => render_or(nodes),
        SearchPredicate::Not(inner) => format!("NOT {}", render_key(inner)),
    }
}

fn render_or(nodes: &[SearchPredicate]) -> String {
    match nodes {
        [] => "NOT ALL".to_string(),
        [single] => render_key(single),
        [first, second] => format!("OR {} {}", render_key(first), render_key(second)),
        [first, rest @ ..] => format!("OR {} ({})", render_key(first), render_or(rest)),
    }
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn join_flags(flags: &[Flag]) -> String {
    flags
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_fetch_items(items: &FetchItems) -> String {
    let mut parts = Vec::new();
    if items.uid {
        parts.push("UID".to_string());
    }
    if items.flags {
        parts.push("FLAGS".to_string());
    }
    if items.envelope {
        parts.push("ENVELOPE".to_string());
    }
    if items.internal_date {
        parts.push("INTERNALDATE".to_string());
    }
    if items.size {
        parts.push("RFC822.SIZE".to_string());
    }
    if items.body_structure {
        parts.push("BODYSTRUCTURE".to_string());
    }
    match &items.section {
        Some(BodySection::Full) => parts.push("BODY.PEEK[]".to_string()),
        Some(BodySection::Part(path)) => parts.push(format!("BODY.PEEK[{path}]")),
        None => {}
    }
    format!("({})", parts.join(" "))
}

fn convert_fetch(fetch: &Fetch, items: &FetchItems) -> FetchedMessage {
    let body = match &items.section {
        Some(BodySection::Full) => fetch.body().map(<[u8]>::to_vec),
        Some(BodySection::Part(path)) => fetch
            .section(&SectionPath::Part(path.0.clone(), None))
            .map(<[u8]>::to_vec),
        None => None,
    };

    FetchedMessage {
        seq: fetch.message,
        uid: fetch.uid,
        flags: fetch.flags().iter().filter_map(from_imap_flag).collect(),
        envelope: fetch.envelope().map(convert_envelope),
        internal_date: fetch.internal_date(),
        size: fetch.size,
        body,
        structure: fetch.bodystructure().map(convert_structure),
    }
}

fn from_imap_flag(flag: &ImapFlag<'_>) -> Option<Flag> {
    match flag {
        ImapFlag::Seen => Some(Flag::Seen),
        ImapFlag::Answered => Some(Flag::Answered),
        ImapFlag::Flagged => Some(Flag::Flagged),
        ImapFlag::Deleted => Some(Flag::Deleted),
        ImapFlag::Draft => Some(Flag::Draft),
        ImapFlag::Custom(name) => Some(Flag::Custom(name.to_string())),
        _ => None,
    }
}

fn to_imap_flag(flag: &Flag) -> ImapFlag<'static> {
    match flag {
        Flag::Seen => ImapFlag::Seen,
        Flag::Answered => ImapFlag::Answered,
        Flag::Flagged => ImapFlag::Flagged,
        Flag::Deleted => ImapFlag::Deleted,
        Flag::Draft => ImapFlag::Draft,
        Flag::Custom(name) => ImapFlag::Custom(Cow::Owned(name.clone())),
    }
}

fn convert_envelope(envelope: &imap_proto::types::Envelope<'_>) -> Envelope {
    Envelope {
        date: envelope.date.as_ref().map(|value| lossy(value.as_ref())),
        subject: envelope
            .subject
            .as_ref()
            .map(|value| decode_encoded_words(value.as_ref())),
        from: convert_addresses(envelope.from.as_deref()),
        reply_to: convert_addresses(envelope.reply_to.as_deref()),
        to: convert_addresses(envelope.to.as_deref()),
        cc: convert_addresses(envelope.cc.as_deref()),
        message_id: envelope.message_id.as_ref().map(|value| lossy(value.as_ref())),
        in_reply_to: envelope.in_reply_to.as_ref().map(|value| lossy(value.as_ref())),
    }
}

fn convert_addresses(addresses: Option<&[imap_proto::types::Address<'_>]>) -> Vec<Address> {
    addresses
        .unwrap_or_default()
        .iter()
        .filter_map(|address| {
            let mailbox = address.mailbox.as_ref().map(|value| lossy(value.as_ref()))?;
            let email = match address.host.as_ref().map(|value| lossy(value.as_ref())) {
                Some(host) if !host.is_empty() => format!("{mailbox}@{host}"),
                _ => mailbox,
            };
            Some(Address {
                name: address
                    .name
                    .as_ref()
                    .map(|value| decode_encoded_words(value.as_ref()))
                    .filter(|name| !name.is_empty()),
                email,
            })
        })
        .collect()
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Decodes RFC 2047 words by parsing a synthetic header.
fn decode_encoded_words(raw: &[u8]) -> String {
    let text = lossy(raw);
    if !text.contains("=?") {
        return text;
    }

    let synthetic = format!("Subject: {text}\r\n\r\n");
    MessageParser::default()
        .parse(synthetic.as_bytes())
        .and_then(|message| message.subject().map(str::to_string))
        .unwrap_or(text)
}

fn convert_structure(structure: &BodyStructure<'_>) -> MimeNode {
    match structure {
        BodyStructure::Multipart { common, bodies, .. } => MimeNode {
            media_type: common.ty.ty.to_ascii_lowercase(),
            subtype: common.ty.subtype.to_ascii_lowercase(),
            params: owned_params(common.ty.params.as_deref()),
            disposition: common.disposition.as_ref().map(|disposition| Disposition {
                kind: disposition.ty.to_ascii_lowercase(),
                params: owned_params(disposition.params.as_deref()),
            }),
            encoding: None,
            size: None,
            children: bodies.iter().map(convert_structure).collect(),
        },
        BodyStructure::Basic { common, other, .. }
        | BodyStructure::Text { common, other, .. }
        | BodyStructure::Message { common, other, .. } => MimeNode {
            media_type: common.ty.ty.to_ascii_lowercase(),
            subtype: common.ty.subtype.to_ascii_lowercase(),
            params: owned_params(common.ty.params.as_deref()),
            disposition: common.disposition.as_ref().map(|disposition| Disposition {
                kind: disposition.ty.to_ascii_lowercase(),
                params: owned_params(disposition.params.as_deref()),
            }),
            encoding: Some(encoding_name(&other.transfer_encoding)),
            size: Some(u64::from(other.octets)),
            children: Vec::new(),
        },
    }
}

fn owned_params(params: Option<&[(&str, &str)]>) -> Vec<(String, String)> {
    params
        .unwrap_or_default()
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn encoding_name(encoding: &ContentEncoding<'_>) -> String {
    match encoding {
        ContentEncoding::SevenBit => "7bit".to_string(),
        ContentEncoding::EightBit => "8bit".to_string(),
        ContentEncoding::Binary => "binary".to_string(),
        ContentEncoding::Base64 => "base64".to_string(),
        ContentEncoding::QuotedPrintable => "quoted-printable".to_string(),
        ContentEncoding::Other(other) => other.to_ascii_lowercase(),
    }
}
