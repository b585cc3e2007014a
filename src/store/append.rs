//! Appending a new message to a mailbox, as a local delivery agent does.

use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{MboxError, Result};

/// Result of formatting one message for appending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendSummary {
    /// Bytes added to the mailbox.
    pub bytes: u64,
    /// Body lines that received a `>` prefix.
    pub escaped_lines: usize,
}

/// Format a message read from `reader` for the end of a mailbox.
///
/// Lines up to and including the first empty line are header lines and
/// are copied verbatim, even when they start with `From `. In the body a
/// line starting with `From ` gets a `>` prefix. Every line ends with
/// `\n`, and one empty line closes the message.
///
/// Nothing on the read side strips the `>` again.
pub fn format_for_append<R: BufRead>(mut reader: R) -> std::io::Result<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let mut line = Vec::new();
    let mut in_header = true;
    let mut escaped = 0;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let content = line.strip_suffix(b"\n").unwrap_or(&line[..]);
        let content = content.strip_suffix(b"\r").unwrap_or(content);

        if in_header {
            if content.is_empty() {
                in_header = false;
            }
        } else if content.starts_with(b"From ") {
            out.push(b'>');
            escaped += 1;
        }
        out.extend_from_slice(content);
        out.push(b'\n');
    }

    out.push(b'\n');
    Ok((out, escaped))
}

/// Append the message from `reader` to the mailbox at `path`.
///
/// The mailbox is created (mode `0660` on Unix) if missing. The whole
/// message is read before the mailbox is opened, so a failing reader adds
/// nothing to the file.
pub fn append_to_mbox<R: BufRead>(path: &Path, reader: R) -> Result<AppendSummary> {
    let (data, escaped_lines) =
        format_for_append(reader).map_err(|e| MboxError::io("<stdin>", e))?;

    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o660);
    }
    let mut file = options.open(path).map_err(|e| MboxError::io(path, e))?;
    debug!(path = %path.display(), bytes = data.len(), "Appending message");

    file.write_all(&data).map_err(|e| MboxError::io(path, e))?;
    file.flush().map_err(|e| MboxError::io(path, e))?;

    info!(path = %path.display(), escaped_lines, "Message appended");
    Ok(AppendSummary {
        bytes: data.len() as u64,
        escaped_lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_body_from_lines_only() {
        let input = b"From sender@x Mon Jan 1 00:00:00 2024\r\nSubject: hi\n\nFrom here on\nok\n>From stays\n";
        let (out, escaped) = format_for_append(&input[..]).unwrap();
        assert_eq!(
            out,
            b"From sender@x Mon Jan 1 00:00:00 2024\nSubject: hi\n\n>From here on\nok\n>From stays\n\n"
        );
        assert_eq!(escaped, 1);
    }

    #[test]
    fn test_header_from_lines_are_verbatim() {
        let (out, escaped) = format_for_append(&b"From a\nFrom b\n\nbody"[..]).unwrap();
        assert_eq!(out, b"From a\nFrom b\n\nbody\n\n");
        assert_eq!(escaped, 0);
    }

    #[test]
    fn test_append_creates_and_extends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inbox");

        append_to_mbox(&path, &b"From a\nSubject: 1\n\none\n"[..]).unwrap();
        let summary = append_to_mbox(&path, &b"From b\nSubject: 2\n\nFrom two\n"[..]).unwrap();
        assert_eq!(summary.escaped_lines, 1);

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(
            contents,
            b"From a\nSubject: 1\n\none\n\nFrom b\nSubject: 2\n\n>From two\n\n"
        );
        let messages = crate::parser::mbox::split_bytes(&contents);
        assert_eq!(messages.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_new_mailbox_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inbox");
        append_to_mbox(&path, &b"From a\n\nx\n"[..]).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        // umask may clear bits, never add them
        assert_eq!(mode & !0o660, 0);
    }
}
