use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::mail::body::decode_transfer;
use crate::mail::search::{self, SearchOptions};
use crate::mail::sequence::{self, SequenceSet};
use crate::mail::structure::{self, AttachmentDescriptor};
use crate::protocol::{FetchItems, Flag, ImapSession, MailboxInfo, StoreAction};

use super::models::{Attachment, LabelInfo, Message, MessageSummary};

/// Special-purpose mailbox names on the bridge.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Folders {
    pub trash: String,
    pub drafts: String,
    pub label_prefix: String,
}

impl Folders {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            trash: settings.trash_mailbox().to_string(),
            drafts: settings.drafts_mailbox().to_string(),
            label_prefix: settings.label_prefix().to_string(),
        }
    }

    pub fn label_path(&self, label: &str) -> String {
        format!("{}{}", self.label_prefix, label.trim())
    }
}

impl Default for Folders {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ListOptions {
    pub limit: u32,
    pub offset: u32,
    pub unread_only: bool,
}

/// Messages resolved for a batch operation in a selected mailbox.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Selection {
    pub mailbox: String,
    pub set: SequenceSet,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FlagChanges {
    pub add: Vec<Flag>,
    pub remove: Vec<Flag>,
}

impl FlagChanges {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Mail operations expressed as IMAP command sequences over one session.
pub struct MailClient<S: ImapSession> {
    session: S,
    folders: Folders,
}

impl<S: ImapSession> MailClient<S> {
    pub fn new(session: S, folders: Folders) -> Self {
        Self { session, folders }
    }

    pub fn folders(&self) -> &Folders {
        &self.folders
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    pub fn logout(mut self) -> AppResult<()> {
        self.session.logout()
    }

    /// Lists a window of the mailbox, newest first. `offset` skips the newest messages.
    pub fn list(&mut self, mailbox: &str, options: ListOptions) -> AppResult<Vec<MessageSummary>> {
        if options.limit == 0 {
            return Err(AppError::InvalidInput(
                "limit must be greater than 0".to_string(),
            ));
        }

        let status = self.session.select(mailbox)?;
        if status.messages <= options.offset {
            return Ok(Vec::new());
        }

        let end = status.messages - options.offset;
        let start = end.saturating_sub(options.limit - 1).max(1);
        let Some(set) = SequenceSet::range(start, end) else {
            return Ok(Vec::new());
        };
        debug!(mailbox, range = %set, "listing messages");

        let fetched = self.session.fetch(&set, &FetchItems::summary())?;
        let mut summaries = fetched
            .iter()
            .filter(|fetch| !options.unread_only || !fetch.has_flag(&Flag::Seen))
            .map(MessageSummary::from_fetch)
            .collect::<Vec<_>>();
        summaries.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(summaries)
    }

    pub fn get(&mut self, mailbox: &str, id: &str) -> AppResult<Message> {
        let set = single(id)?;
        let status = self.session.select(mailbox)?;
        ensure_exists(id, &set, status.messages)?;

        self.session
            .fetch(&set, &FetchItems::full_message())?
            .into_iter()
            .next()
            .map(Message::from_fetch)
            .ok_or_else(|| AppError::MessageNotFound(id.to_string()))
    }

    pub fn search(
        &mut self,
        mailbox: &str,
        options: &SearchOptions,
        limit: Option<usize>,
    ) -> AppResult<Vec<MessageSummary>> {
        self.session.select(mailbox)?;
        let predicate = search::build(options);
        let matches = self.session.search(&predicate)?;
        debug!(mailbox, matched = matches.len(), "search complete");

        let Some(set) = SequenceSet::from_numbers(matches) else {
            return Ok(Vec::new());
        };

        let mut summaries = self
            .session
            .fetch(&set, &FetchItems::summary())?
            .iter()
            .map(MessageSummary::from_fetch)
            .collect::<Vec<_>>();
        summaries.sort_by(|a, b| b.seq.cmp(&a.seq));
        if let Some(limit) = limit {
            summaries.truncate(limit);
        }
        Ok(summaries)
    }

    /// Selects `mailbox` and resolves explicit ids or a query into a batch target.
    ///
    /// Ids are validated before anything is sent. `Ok(None)` means the query matched nothing.
    pub fn resolve_targets<I: AsRef<str>>(
        &mut self,
        mailbox: &str,
        ids: &[I],
        query: Option<&str>,
    ) -> AppResult<Option<Selection>> {
        let has_query = query.map(str::trim).is_some_and(|query| !query.is_empty());
        if ids.is_empty() && !has_query {
            return Err(AppError::InvalidInput(
                "provide message ids or --query".to_string(),
            ));
        }

        let explicit = if ids.is_empty() {
            None
        } else {
            Some(sequence::build(ids)?)
        };

        self.session.select(mailbox)?;
        let set = match explicit {
            Some(set) => Some(set),
            None => sequence::resolve_targets(&mut self.session, ids, query)?,
        };

        Ok(set.map(|set| Selection {
            mailbox: mailbox.to_string(),
            set,
        }))
    }

    /// Moves to trash, or expunges when `permanent` or already in trash.
    pub fn delete(&mut self, target: &Selection, permanent: bool) -> AppResult<()> {
        if permanent || target.mailbox == self.folders.trash {
            return self.purge(target);
        }

        let trash = self.folders.trash.clone();
        self.move_to(target, &trash)
    }

    /// Marks the target `\Deleted` and expunges it.
    pub fn purge(&mut self, target: &Selection) -> AppResult<()> {
        self.session
            .store(&target.set, StoreAction::Add, &[Flag::Deleted])?;
        self.session.expunge()?;
        info!(mailbox = %target.mailbox, set = %target.set, "expunged messages");
        Ok(())
    }

    pub fn move_to(&mut self, target: &Selection, destination: &str) -> AppResult<()> {
        self.session.copy(&target.set, destination)?;
        self.purge(target)?;
        info!(from = %target.mailbox, to = destination, set = %target.set, "moved messages");
        Ok(())
    }

    pub fn set_flags(&mut self, target: &Selection, changes: &FlagChanges) -> AppResult<()> {
        if changes.is_empty() {
            return Err(AppError::InvalidInput(
                "no flag changes requested".to_string(),
            ));
        }

        if !changes.add.is_empty() {
            self.session
                .store(&target.set, StoreAction::Add, &changes.add)?;
        }
        if !changes.remove.is_empty() {
            self.session
                .store(&target.set, StoreAction::Remove, &changes.remove)?;
        }
        Ok(())
    }

    /// Lists attachments from the body structure only.
    pub fn attachments(&mut self, mailbox: &str, id: &str) -> AppResult<Vec<AttachmentDescriptor>> {
        let set = single(id)?;
        let status = self.session.select(mailbox)?;
        ensure_exists(id, &set, status.messages)?;

        let fetched = self
            .session
            .fetch(&set, &FetchItems::structure())?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::MessageNotFound(id.to_string()))?;

        Ok(fetched
            .structure
            .as_ref()
            .map(structure::walk)
            .unwrap_or_default())
    }

    /// Fetches and decodes only the attachment at `index`.
    pub fn download_attachment(
        &mut self,
        mailbox: &str,
        id: &str,
        index: usize,
    ) -> AppResult<Attachment> {
        let set = single(id)?;
        let status = self.session.select(mailbox)?;
        ensure_exists(id, &set, status.messages)?;

        let root = self
            .session
            .fetch(&set, &FetchItems::structure())?
            .into_iter()
            .next()
            .and_then(|fetched| fetched.structure)
            .ok_or_else(|| AppError::MessageNotFound(id.to_string()))?;

        let descriptor = structure::locate(&root, index).ok_or_else(|| {
            AppError::AttachmentNotFound(format!(
                "message {id} has {} attachment(s), no index {index}",
                structure::count_attachments(&root)
            ))
        })?;
        debug!(id, index, part = %descriptor.part_path, "downloading attachment");

        let raw = self
            .session
            .fetch(&set, &FetchItems::part(descriptor.part_path.clone()))?
            .into_iter()
            .next()
            .and_then(|fetched| fetched.body)
            .ok_or_else(|| {
                AppError::Protocol(format!(
                    "server returned no data for part {} of message {id}",
                    descriptor.part_path
                ))
            })?;

        let data = decode_transfer(&raw, descriptor.encoding.as_deref().unwrap_or_default());
        Ok(Attachment {
            index: descriptor.index,
            part_path: descriptor.part_path,
            filename: descriptor.filename,
            content_type: descriptor.content_type,
            size: Some(data.len() as u64),
            data: Some(data),
        })
    }

    pub fn mailboxes(&mut self) -> AppResult<Vec<MailboxInfo>> {
        self.session.list_mailboxes()
    }

    pub fn create_mailbox(&mut self, name: &str) -> AppResult<()> {
        self.session.create_mailbox(name)
    }

    pub fn delete_mailbox(&mut self, name: &str) -> AppResult<()> {
        self.session.delete_mailbox(name)
    }

    pub fn labels(&mut self) -> AppResult<Vec<LabelInfo>> {
        let prefix = self.folders.label_prefix.clone();
        Ok(self
            .session
            .list_mailboxes()?
            .into_iter()
            .filter_map(|mailbox| {
                let name = mailbox.name.strip_prefix(&prefix)?.to_string();
                (!name.is_empty()).then_some(LabelInfo {
                    name,
                    full_path: mailbox.name,
                })
            })
            .collect())
    }

    /// Copies the target into the label folder, which must already exist.
    pub fn add_label(&mut self, target: &Selection, label: &str) -> AppResult<String> {
        let path = self.folders.label_path(label);
        let exists = self
            .session
            .list_mailboxes()?
            .iter()
            .any(|mailbox| mailbox.name == path);
        if !exists {
            return Err(AppError::InvalidInput(format!(
                "label {label:?} does not exist; run `pmail label list`"
            )));
        }

        self.session.copy(&target.set, &path)?;
        Ok(path)
    }

    pub fn save_draft(&mut self, message: &[u8]) -> AppResult<()> {
        let drafts = self.folders.drafts.clone();
        self.session
            .append(&drafts, message, &[Flag::Draft, Flag::Seen])
    }

    /// Appends the new draft, then removes the one it replaces.
    pub fn replace_draft(&mut self, id: &str, message: &[u8]) -> AppResult<()> {
        let set = single(id)?;
        let drafts = self.folders.drafts.clone();
        let status = self.session.select(&drafts)?;
        ensure_exists(id, &set, status.messages)?;

        self.session
            .append(&drafts, message, &[Flag::Draft, Flag::Seen])?;
        self.purge(&Selection {
            mailbox: drafts,
            set,
        })
    }
}

fn single(id: &str) -> AppResult<SequenceSet> {
    sequence::build(&[id])
}

fn ensure_exists(id: &str, set: &SequenceSet, messages: u32) -> AppResult<()> {
    if set.iter().any(|seq| seq > messages) {
        return Err(AppError::MessageNotFound(id.to_string()));
    }
    Ok(())
}
