//! Streaming MBOX splitter.
//!
//! Reads MBOX data line by line and cuts it into message blobs at every
//! `From ` envelope line. Every line is re-terminated with a single `\n`,
//! so `\r\n` input comes out normalized. The splitter never looks at
//! header or body semantics.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MboxError, Result};

/// Size of the internal read buffer (1 MB for fast sequential reads on modern SSDs).
const READ_BUFFER_SIZE: usize = 1024 * 1024;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// MBOX splitter bound to a file on disk.
///
/// The parser is tolerant of:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line
/// - Data before the first `From ` line, or no `From ` line at all
///   (everything read becomes a single message)
/// - A missing newline at EOF
/// - A UTF-8 BOM in front of the first envelope line
pub struct MboxParser {
    path: PathBuf,
}

impl MboxParser {
    /// Create a parser for the given MBOX file.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::metadata(&path).map_err(|e| MboxError::open(&path, e))?;
        Ok(Self { path })
    }

    /// Split the full MBOX, calling `message_callback` for each message found.
    ///
    /// The callback receives `(index, raw_bytes)` and returns `true` to
    /// continue or `false` to stop early.
    ///
    /// Returns the number of messages delivered.
    pub fn parse(&self, message_callback: &mut dyn FnMut(usize, &[u8]) -> bool) -> Result<usize> {
        let file = File::open(&self.path).map_err(|e| MboxError::open(&self.path, e))?;
        let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
        split_messages(reader, message_callback).map_err(|e| MboxError::io(&self.path, e))
    }

    /// Read every message of the mailbox into memory, in file order.
    ///
    /// Either the whole sequence is returned or an error; never a partial list.
    pub fn read_all(&self) -> Result<Vec<Vec<u8>>> {
        let mut messages = Vec::new();
        self.parse(&mut |_, raw| {
            messages.push(raw.to_vec());
            true
        })?;
        debug!(
            path = %self.path.display(),
            count = messages.len(),
            "Split mailbox"
        );
        Ok(messages)
    }
}

/// Split any buffered reader into messages.
///
/// A line starting with `From ` closes the message being accumulated (if it
/// has any content) and becomes the first line of the next one. Whatever is
/// left at EOF is flushed as the final message, so an input without any
/// envelope line yields exactly one message and empty input yields none.
pub fn split_messages<R: BufRead>(
    mut reader: R,
    message_callback: &mut dyn FnMut(usize, &[u8]) -> bool,
) -> std::io::Result<usize> {
    let mut count: usize = 0;
    let mut message_buf: Vec<u8> = Vec::with_capacity(64 * 1024);
    let mut line_buf: Vec<u8> = Vec::with_capacity(4096);
    let mut first_line = true;

    loop {
        line_buf.clear();
        let line_len = reader.read_until(b'\n', &mut line_buf)?;
        if line_len == 0 {
            break; // EOF
        }

        let line = strip_line_terminator(&line_buf);

        if is_mbox_separator(line, first_line) && !message_buf.is_empty() {
            if !message_callback(count, &message_buf) {
                return Ok(count);
            }
            count += 1;
            message_buf.clear();
        }

        message_buf.extend_from_slice(line);
        message_buf.push(b'\n');
        first_line = false;
    }

    // Flush last message
    if !message_buf.is_empty() && message_callback(count, &message_buf) {
        count += 1;
    }

    Ok(count)
}

/// Split an in-memory mailbox.
pub fn split_bytes(data: &[u8]) -> Vec<Vec<u8>> {
    let mut messages = Vec::new();
    // Reading from a slice cannot fail.
    let _ = split_messages(data, &mut |_, raw| {
        messages.push(raw.to_vec());
        true
    });
    messages
}

/// Drop a trailing `\n` and the `\r` right before it, if any.
fn strip_line_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8], first_line: bool) -> bool {
    let line = if first_line {
        line.strip_prefix(UTF8_BOM).unwrap_or(line)
    } else {
        line
    };
    line.starts_with(b"From ")
}
