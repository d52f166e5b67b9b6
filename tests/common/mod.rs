#![allow(dead_code)]

use std::collections::HashMap;

use pmail::error::AppResult;
use pmail::mail::search::SearchPredicate;
use pmail::mail::sequence::SequenceSet;
use pmail::mail::structure::MimeNode;
use pmail::protocol::imap::render_query;
use pmail::protocol::{
    BodySection, FetchItems, FetchedMessage, Flag, ImapSession, MailboxInfo, MailboxStatus,
    StoreAction,
};

/// In-memory session that records every command it receives.
#[derive(Debug, Default)]
pub struct SpySession {
    pub calls: Vec<String>,
    pub messages: u32,
    pub search_results: Vec<u32>,
    pub mailboxes: Vec<String>,
    pub summaries: Vec<FetchedMessage>,
    pub structure: Option<MimeNode>,
    pub parts: HashMap<String, Vec<u8>>,
}

impl SpySession {
    pub fn with_messages(messages: u32) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }
}

fn flag_list(flags: &[Flag]) -> String {
    flags
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

impl ImapSession for SpySession {
    fn select(&mut self, mailbox: &str) -> AppResult<MailboxStatus> {
        self.calls.push(format!("SELECT {mailbox}"));
        Ok(MailboxStatus {
            messages: self.messages,
        })
    }

    fn list_mailboxes(&mut self) -> AppResult<Vec<MailboxInfo>> {
        self.calls.push("LIST".to_string());
        Ok(self
            .mailboxes
            .iter()
            .map(|name| MailboxInfo {
                name: name.clone(),
                delimiter: Some("/".to_string()),
                attributes: Vec::new(),
            })
            .collect())
    }

    fn create_mailbox(&mut self, name: &str) -> AppResult<()> {
        self.calls.push(format!("CREATE {name}"));
        Ok(())
    }

    fn delete_mailbox(&mut self, name: &str) -> AppResult<()> {
        self.calls.push(format!("DELETE {name}"));
        Ok(())
    }

    fn fetch(&mut self, set: &SequenceSet, items: &FetchItems) -> AppResult<Vec<FetchedMessage>> {
        match &items.section {
            Some(BodySection::Part(path)) => {
                self.calls.push(format!("FETCH {set} BODY[{path}]"));
                Ok(set
                    .iter()
                    .map(|seq| FetchedMessage {
                        seq,
                        body: self.parts.get(&path.to_string()).cloned(),
                        ..FetchedMessage::default()
                    })
                    .collect())
            }
            _ if items.body_structure => {
                self.calls.push(format!("FETCH {set} BODYSTRUCTURE"));
                Ok(set
                    .iter()
                    .map(|seq| FetchedMessage {
                        seq,
                        structure: self.structure.clone(),
                        ..FetchedMessage::default()
                    })
                    .collect())
            }
            _ => {
                self.calls.push(format!("FETCH {set}"));
                Ok(self
                    .summaries
                    .iter()
                    .filter(|message| set.contains(message.seq))
                    .cloned()
                    .collect())
            }
        }
    }

    fn search(&mut self, predicate: &SearchPredicate) -> AppResult<Vec<u32>> {
        self.calls.push(format!("SEARCH {}", render_query(predicate)));
        Ok(self.search_results.clone())
    }

    fn store(&mut self, set: &SequenceSet, action: StoreAction, flags: &[Flag]) -> AppResult<()> {
        let sign = match action {
            StoreAction::Add => '+',
            StoreAction::Remove => '-',
        };
        self.calls
            .push(format!("STORE {set} {sign}FLAGS ({})", flag_list(flags)));
        Ok(())
    }

    fn copy(&mut self, set: &SequenceSet, mailbox: &str) -> AppResult<()> {
        self.calls.push(format!("COPY {set} {mailbox}"));
        Ok(())
    }

    fn expunge(&mut self) -> AppResult<()> {
        self.calls.push("EXPUNGE".to_string());
        Ok(())
    }

    fn append(&mut self, mailbox: &str, _message: &[u8], flags: &[Flag]) -> AppResult<()> {
        self.calls
            .push(format!("APPEND {mailbox} ({})", flag_list(flags)));
        Ok(())
    }

    fn logout(&mut self) -> AppResult<()> {
        self.calls.push("LOGOUT".to_string());
        Ok(())
    }
}
