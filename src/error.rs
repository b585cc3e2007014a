//! Centralized error types for mboxview.
//!
//! Only unrecoverable failures live here. Malformed headers, dates and MIME
//! parts are recovered where they are found and never surface as errors.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxview library.
#[derive(Error, Debug)]
pub enum MboxError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The mailbox file does not exist.
    #[error("MBOX file not found: {0}")]
    FileNotFound(PathBuf),

    /// A message index outside the current read of the mailbox.
    #[error("Message index {index} out of range (mailbox has {count} messages)")]
    MessageIndexOutOfRange { index: usize, count: usize },

    /// A mutation was requested while edit mode is disabled.
    #[error("Mailbox is read-only (enable edit mode to modify it)")]
    ReadOnly,

    /// The requested status value cannot be written into a header line.
    #[error("Invalid status value: {0:?}")]
    InvalidStatus(String),

    /// A config file that is not valid TOML for [`crate::config::Config`].
    #[error("Invalid config file '{path}': {message}")]
    Config { path: PathBuf, message: String },

    /// The caller passed an argument that makes no sense for the operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience alias for `Result<T, MboxError>`.
pub type Result<T> = std::result::Result<T, MboxError>;

impl MboxError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Like [`MboxError::io`], but maps `NotFound` to [`MboxError::FileNotFound`].
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `MboxError::io`).
impl From<std::io::Error> for MboxError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
