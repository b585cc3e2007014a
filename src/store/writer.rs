//! Crash-safe mailbox write-back.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{MboxError, Result};

/// Replace the file at `path` with `messages`, concatenated in order.
///
/// The data goes to a temporary file in the same directory, which is
/// flushed, synced and then renamed over `path`. On any failure the
/// temporary file is removed and `path` is left untouched. The original
/// file's permissions are carried over when it exists.
///
/// Returns the number of bytes written.
pub fn write_messages_atomic<M: AsRef<[u8]>>(path: &Path, messages: &[M]) -> Result<u64> {
    let written = write_atomic(path, |writer| {
        let mut written: u64 = 0;
        for message in messages {
            let bytes = message.as_ref();
            writer.write_all(bytes)?;
            written += bytes.len() as u64;
        }
        Ok(written)
    })?;
    info!(path = %path.display(), bytes = written, count = messages.len(), "Mailbox written");
    Ok(written)
}

/// Temp file, fill, flush, sync, rename. The temporary file is dropped (and
/// removed) on every error path.
fn write_atomic<F>(path: &Path, fill: F) -> Result<u64>
where
    F: FnOnce(&mut dyn Write) -> io::Result<u64>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| MboxError::io(dir, e))?;
    debug!(tmp = %tmp.path().display(), "Writing mailbox to temporary file");

    let written = {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        let written = fill(&mut writer).map_err(|e| MboxError::io(path, e))?;
        writer.flush().map_err(|e| MboxError::io(path, e))?;
        written
    };
    tmp.as_file()
        .sync_all()
        .map_err(|e| MboxError::io(path, e))?;

    if let Ok(metadata) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| MboxError::io(path, e))?;
    }

    tmp.persist(path).map_err(|e| MboxError::io(path, e.error))?;
    Ok(written)
}
