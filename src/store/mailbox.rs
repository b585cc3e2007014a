//! Mailbox-level operations: listing, content decoding and status updates.
//!
//! Every operation reads the file fresh. Message indexes are positions in
//! that read and are only valid until the mailbox is rewritten.

use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{MboxError, Result};
use crate::model::address::decode_address_list;
use crate::model::mail::{
    EmailContent, EmailSummary, Message, STATUS_DELETED, STATUS_NEW, STATUS_READ,
};
use crate::parser::date::parse_date;
use crate::parser::encoded_word::decode_encoded_words;
use crate::parser::header::HeaderAccess;
use crate::parser::mbox::MboxParser;
use crate::parser::mime::decode_body;
use crate::store::status;
use crate::store::writer::write_messages_atomic;

/// A mailbox file plus the configuration it is accessed with.
pub struct Mailbox<'a> {
    path: PathBuf,
    config: &'a Config,
}

impl<'a> Mailbox<'a> {
    /// Resolve `name` against `general.mbox_dir` and bind it to `config`.
    ///
    /// Absolute names are used as is. With a base directory configured,
    /// names that climb out of it (`..`) are rejected.
    pub fn open(config: &'a Config, name: impl AsRef<Path>) -> Result<Self> {
        let path = resolve_mailbox_path(config, name.as_ref())?;
        Ok(Self { path, config })
    }

    /// Split the mailbox into raw message blobs.
    pub fn read_messages(&self) -> Result<Vec<Vec<u8>>> {
        MboxParser::new(&self.path)?.read_all()
    }

    /// Summaries of every non-deleted message, newest first.
    ///
    /// Messages without a parsable date sort last; ties keep file order.
    pub fn list_messages(&self) -> Result<Vec<EmailSummary>> {
        let messages = self.read_messages()?;
        let mut summaries: Vec<EmailSummary> = messages
            .iter()
            .enumerate()
            .map(|(id, raw)| summarize(id, raw))
            .filter(|summary| summary.status != STATUS_DELETED)
            .collect();
        sort_summaries(&mut summaries);
        debug!(
            path = %self.path.display(),
            total = messages.len(),
            listed = summaries.len(),
            "Listed mailbox"
        );
        Ok(summaries)
    }

    /// Decoded body and attachment names of the message at `index`.
    pub fn get_content(&self, index: usize) -> Result<EmailContent> {
        let messages = self.read_messages()?;
        let raw = messages
            .get(index)
            .ok_or(MboxError::MessageIndexOutOfRange {
                index,
                count: messages.len(),
            })?;
        let message = Message::split(raw);
        Ok(decode_body(
            &message.headers(),
            message.body,
            &self.config.parser,
        ))
    }

    /// Set the `Status` header of the message at `index` and write the
    /// mailbox back atomically.
    ///
    /// Returns `false` without touching the file when the status already
    /// has that value. Requires edit mode.
    pub fn update_status(&self, index: usize, new_status: &str) -> Result<bool> {
        self.ensure_writable()?;
        status::check_status_value(new_status)?;

        let mut messages = self.read_messages()?;
        if !status::update_status(&mut messages, index, new_status)? {
            debug!(index, status = new_status, "Status unchanged");
            return Ok(false);
        }

        write_messages_atomic(&self.path, &messages)?;
        info!(
            path = %self.path.display(),
            index,
            status = new_status,
            "Updated message status"
        );
        Ok(true)
    }

    /// Mark the message at `index` as read (`Status: RO`).
    pub fn mark_read(&self, index: usize) -> Result<bool> {
        self.update_status(index, STATUS_READ)
    }

    /// Mark the message at `index` for deletion (`Status: D`).
    pub fn mark_deleted(&self, index: usize) -> Result<bool> {
        self.update_status(index, STATUS_DELETED)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.config.general.edit_mode {
            Ok(())
        } else {
            Err(MboxError::ReadOnly)
        }
    }
}

/// Map a mailbox name to a file path.
pub fn resolve_mailbox_path(config: &Config, name: &Path) -> Result<PathBuf> {
    if name.as_os_str().is_empty() {
        return Err(MboxError::InvalidArgument("empty mailbox name".to_string()));
    }
    let Some(base) = config.general.mbox_dir.as_deref() else {
        return Ok(name.to_path_buf());
    };
    if name.is_absolute() {
        return Ok(name.to_path_buf());
    }
    if name
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(MboxError::InvalidArgument(format!(
            "mailbox name escapes the mailbox directory: {}",
            name.display()
        )));
    }
    Ok(base.join(name))
}

/// Build the listing row for one raw message.
pub fn summarize(id: usize, raw: &[u8]) -> EmailSummary {
    let headers = Message::split(raw).headers();
    let date = headers.get("Date").unwrap_or_default();
    EmailSummary {
        id,
        from: decode_address_list(&headers.get("From").unwrap_or_default()),
        parsed_timestamp: parse_date(&date),
        date,
        subject: decode_encoded_words(&headers.get("Subject").unwrap_or_default()),
        status: headers
            .get("Status")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| STATUS_NEW.to_string()),
    }
}

/// Newest first; undated (or epoch) rows last; ties by ascending id.
pub fn sort_summaries(summaries: &mut [EmailSummary]) {
    summaries.sort_by(|a, b| {
        let a_ts = a.parsed_timestamp.filter(|t| t.timestamp() != 0);
        let b_ts = b.parsed_timestamp.filter(|t| t.timestamp() != 0);
        match (a_ts, b_ts) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then(a.id.cmp(&b.id))
    });
}

/// Whether a raw message carries `Status: D`.
pub fn is_deleted(raw: &[u8]) -> bool {
    Message::split(raw).headers().get("Status").as_deref() == Some(STATUS_DELETED)
}

/// Drop messages marked deleted. Returns the survivors and how many were
/// removed.
pub fn remove_deleted(messages: Vec<Vec<u8>>) -> (Vec<Vec<u8>>, usize) {
    let before = messages.len();
    let kept: Vec<Vec<u8>> = messages.into_iter().filter(|raw| !is_deleted(raw)).collect();
    let removed = before - kept.len();
    (kept, removed)
}
