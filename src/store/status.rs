//! `Status:` header mutation.
//!
//! Works on the raw header bytes so every line except the `Status:` line
//! is kept exactly as it was.

use crate::error::{MboxError, Result};
use crate::model::mail::Message;

const STATUS_NAME: &[u8] = b"status";

/// Set `Status` in a header block.
///
/// Returns `None` when the current value already equals `new_status`.
/// An existing `Status:` line is rewritten in place, keeping its field name
/// and line ending. Without one, `Status: <new_status>\n` is appended.
pub fn update_status_header(header_block: &[u8], new_status: &str) -> Option<Vec<u8>> {
    let mut offset = 0;
    for line in header_block.split_inclusive(|&b| b == b'\n') {
        let start = offset;
        offset += line.len();

        let Some(colon) = status_colon(line) else {
            continue;
        };
        let content = line.strip_suffix(b"\n").unwrap_or(line);
        let current = String::from_utf8_lossy(&content[colon + 1..]);
        if current.trim() == new_status {
            return None;
        }

        let mut out = Vec::with_capacity(header_block.len() + new_status.len());
        out.extend_from_slice(&header_block[..start]);
        out.extend_from_slice(&line[..colon]);
        out.extend_from_slice(b": ");
        out.extend_from_slice(new_status.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(&header_block[offset..]);
        return Some(out);
    }

    let mut out = header_block.to_vec();
    if !out.is_empty() && !out.ends_with(b"\n") {
        out.push(b'\n');
    }
    out.extend_from_slice(b"Status: ");
    out.extend_from_slice(new_status.as_bytes());
    out.push(b'\n');
    Some(out)
}

/// Position of the colon when `line` is a `Status:` field line.
fn status_colon(line: &[u8]) -> Option<usize> {
    let colon = line.iter().position(|&b| b == b':')?;
    let name = line[..colon].trim_ascii_end();
    name.eq_ignore_ascii_case(STATUS_NAME).then_some(colon)
}

/// Set `Status` on one raw message blob. `None` means unchanged.
pub fn update_message_status(raw: &[u8], new_status: &str) -> Option<Vec<u8>> {
    let message = Message::split(raw);
    let header_block = update_status_header(message.header_block, new_status)?;
    Some(Message::assemble(
        message.envelope_line,
        &header_block,
        message.body,
    ))
}

/// Set `Status` on the message at `index` of an in-memory mailbox.
///
/// Returns whether the message changed.
pub fn update_status(messages: &mut [Vec<u8>], index: usize, new_status: &str) -> Result<bool> {
    check_status_value(new_status)?;
    let count = messages.len();
    let raw = messages
        .get_mut(index)
        .ok_or(MboxError::MessageIndexOutOfRange { index, count })?;

    match update_message_status(raw, new_status) {
        Some(updated) => {
            *raw = updated;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// A status must be a non-empty single-line value.
pub fn check_status_value(status: &str) -> Result<()> {
    if status.trim().is_empty() || status.contains(['\n', '\r']) || status != status.trim() {
        return Err(MboxError::InvalidStatus(status.to_string()));
    }
    Ok(())
}
