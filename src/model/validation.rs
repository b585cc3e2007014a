//! Header validation findings.

use std::fmt;

/// Kind of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    /// A required header is absent.
    Missing,
    /// A header is present but does not follow its grammar.
    Invalid,
    /// `Status: D`, informational only.
    Deleted,
}

/// One finding about one header of one message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Index of the message in the mailbox.
    pub msg_index: usize,
    /// Header field name (`From`, `Date`, `Message-ID`, `Status`).
    pub field: String,
    pub status: FindingStatus,
    /// The offending value or a short explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ValidationResult {
    pub fn missing(msg_index: usize, field: &str) -> Self {
        Self {
            msg_index,
            field: field.to_string(),
            status: FindingStatus::Missing,
            detail: None,
        }
    }

    pub fn invalid(msg_index: usize, field: &str, detail: impl Into<String>) -> Self {
        Self {
            msg_index,
            field: field.to_string(),
            status: FindingStatus::Invalid,
            detail: Some(detail.into()),
        }
    }

    pub fn deleted(msg_index: usize) -> Self {
        Self {
            msg_index,
            field: "Status".to_string(),
            status: FindingStatus::Deleted,
            detail: None,
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            FindingStatus::Missing => {
                write!(f, "Message {}: {} header is missing", self.msg_index, self.field)
            }
            FindingStatus::Invalid => {
                write!(f, "Message {}: {} header is invalid", self.msg_index, self.field)?;
                if let Some(detail) = &self.detail {
                    write!(f, " ({detail})")?;
                }
                Ok(())
            }
            FindingStatus::Deleted => write!(
                f,
                "Message {}: {} = D (will be removed)",
                self.msg_index, self.field
            ),
        }
    }
}
