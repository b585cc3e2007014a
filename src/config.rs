//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MBOXVIEW_CONFIG` (environment variable)
//! 2. `~/.config/mboxview/config.toml` (Linux/macOS)
//!    `%APPDATA%\mboxview\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! The loaded [`Config`] is passed by reference into every operation that
//! needs it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MboxError, Result};
use crate::parser::mime::MAX_DEPTH;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Message parsing limits and defaults.
    pub parser: ParserConfig,
    /// Text output settings.
    pub display: DisplayConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Base directory that relative mailbox names are resolved against.
    pub mbox_dir: Option<PathBuf>,
    /// Allow commands that modify mailboxes.
    pub edit_mode: bool,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

/// Message parsing limits and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Deepest multipart nesting that is still decoded.
    pub max_mime_depth: usize,
    /// Charset for text parts that do not declare one.
    pub default_charset: String,
}

/// Text output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// `strftime` format string for dates in listings.
    pub date_format: String,
    /// Subject column width.
    pub subject_width: usize,
    /// From column width.
    pub from_width: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            mbox_dir: None,
            edit_mode: false,
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_mime_depth: MAX_DEPTH,
            default_charset: "utf-8".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d %H:%M".to_string(),
            subject_width: 50,
            from_width: 30,
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration from `explicit`, or from the standard location.
///
/// Never fails. A missing default file yields the defaults; an unreadable or
/// malformed file yields the defaults plus the error, which the caller logs
/// once logging is set up.
pub fn load_config(explicit: Option<&Path>) -> (Config, Option<MboxError>) {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match config_file_path() {
            Some(path) if path.exists() => path,
            _ => return (Config::default(), None),
        },
    };
    match read_config(&path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (Config::default(), Some(e)),
    }
}

/// Read and parse one config file.
pub fn read_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| MboxError::open(path, e))?;
    toml::from_str(&contents).map_err(|e| MboxError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    // 1. Environment variable override
    if let Ok(env_path) = std::env::var("MBOXVIEW_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    // 2. Standard config directory
    dirs::config_dir().map(|d| d.join("mboxview").join("config.toml"))
}

/// File name of the log inside [`cache_dir`].
pub const LOG_FILE_NAME: &str = "mboxview.log";

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxview")
}
