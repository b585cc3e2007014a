//! Core message and view types.

use chrono::{DateTime, Utc};

use crate::parser::header::{decode_header_bytes, ParsedHeaders};

/// `Status` value of a message that has been read.
pub const STATUS_READ: &str = "RO";

/// `Status` value of a message marked for deletion.
pub const STATUS_DELETED: &str = "D";

/// Status reported in listings for messages without a `Status` header.
pub const STATUS_NEW: &str = "N";

/// One message of a mailbox, split into its three regions.
///
/// Borrowed from the raw blob produced by the splitter. The position of the
/// blob in the split sequence is the message index; it is only meaningful
/// for the read it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    /// The `From ` line, without its newline.
    pub envelope_line: &'a [u8],
    /// Header lines, each ending with `\n`, without the blank separator line.
    pub header_block: &'a [u8],
    /// Everything after the blank line.
    pub body: &'a [u8],
}

impl<'a> Message<'a> {
    /// Split a raw message blob.
    ///
    /// The envelope is the text up to the first `\n`. The remainder is split
    /// at the first blank line; without one, it is all header block and the
    /// body is empty.
    pub fn split(raw: &'a [u8]) -> Self {
        let (envelope_line, rest) = match raw.iter().position(|&b| b == b'\n') {
            Some(pos) => (&raw[..pos], &raw[pos + 1..]),
            None => (raw, &raw[raw.len()..]),
        };

        let (header_block, body) = if let Some(body) = rest.strip_prefix(b"\n") {
            (&rest[..0], body)
        } else {
            match find_blank_line(rest) {
                Some(pos) => (&rest[..pos + 1], &rest[pos + 2..]),
                None => (rest, &rest[rest.len()..]),
            }
        };

        Self {
            envelope_line,
            header_block,
            body,
        }
    }

    /// Header block decoded to text.
    pub fn header_text(&self) -> String {
        decode_header_bytes(self.header_block)
    }

    /// Parse the header block.
    pub fn headers(&self) -> ParsedHeaders {
        ParsedHeaders::parse(&self.header_text())
    }

    /// Reassemble `envelope + "\n" + headers + "\n" + body`.
    pub fn assemble(envelope_line: &[u8], header_block: &[u8], body: &[u8]) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(envelope_line.len() + header_block.len() + body.len() + 2);
        out.extend_from_slice(envelope_line);
        out.push(b'\n');
        out.extend_from_slice(header_block);
        out.push(b'\n');
        out.extend_from_slice(body);
        out
    }
}

/// Position of the first `\n\n` in `data`.
fn find_blank_line(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\n\n")
}

/// One row of a mailbox listing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EmailSummary {
    /// Index of the message in the mailbox.
    pub id: usize,
    /// Decoded sender list.
    pub from: String,
    /// Raw `Date:` header text.
    pub date: String,
    /// Decoded subject.
    pub subject: String,
    /// `Status:` header value, `"N"` when absent.
    pub status: String,
    /// Parsed `Date:`, used for ordering only.
    #[serde(skip)]
    pub parsed_timestamp: Option<DateTime<Utc>>,
}

/// Decoded content of one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailContent {
    /// First `text/plain` body found.
    pub body_text: String,
    /// First `text/html` body found.
    #[serde(rename = "bodyHTML", skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,
    /// Primary display type: `text/plain`, `text/html`, or empty when no
    /// text body was found.
    pub body_type: String,
    /// Both a plain and an HTML body are present.
    pub has_alternate: bool,
    /// Attachment filenames in walk order.
    pub attachments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_regions() {
        let raw = b"From a@x Mon Jan 1\nSubject: Hi\nTo: b@x\n\nBody\nmore\n";
        let msg = Message::split(raw);
        assert_eq!(msg.envelope_line, b"From a@x Mon Jan 1");
        assert_eq!(msg.header_block, b"Subject: Hi\nTo: b@x\n");
        assert_eq!(msg.body, b"Body\nmore\n");
    }

    #[test]
    fn test_split_without_blank_line() {
        let raw = b"From a@x\nSubject: Hi\n";
        let msg = Message::split(raw);
        assert_eq!(msg.header_block, b"Subject: Hi\n");
        assert!(msg.body.is_empty());
    }

    #[test]
    fn test_split_without_headers() {
        let raw = b"From a@x\n\nJust a body\n";
        let msg = Message::split(raw);
        assert!(msg.header_block.is_empty());
        assert_eq!(msg.body, b"Just a body\n");
    }

    #[test]
    fn test_assemble_restores_original() {
        let raw = b"From a@x\nSubject: Hi\n\nBody\n";
        let msg = Message::split(raw);
        let rebuilt = Message::assemble(msg.envelope_line, msg.header_block, msg.body);
        assert_eq!(rebuilt, raw.to_vec());
    }

    #[test]
    fn test_email_content_json_shape() {
        let content = EmailContent {
            body_text: "hi".into(),
            body_html: Some("<p>hi</p>".into()),
            body_type: "text/plain".into(),
            has_alternate: true,
            attachments: vec!["a.txt".into()],
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["bodyText"], "hi");
        assert_eq!(json["bodyHTML"], "<p>hi</p>");
        assert_eq!(json["hasAlternate"], true);
        assert_eq!(json["attachments"][0], "a.txt");
    }
}
