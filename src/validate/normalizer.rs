//! Header normalization: fill in a missing Message-ID and re-emit the
//! header block in canonical folded form.

use std::borrow::Cow;

use tracing::debug;

use crate::model::mail::Message;
use crate::model::validation::ValidationResult;
use crate::parser::header::{HeaderField, ParsedHeaders};
use crate::validate::message_id::synthesize_message_id;

/// Normalize one message's headers.
///
/// Returns the rebuilt header text and the "missing" findings. A missing
/// `From` or `Date` is only reported; a missing `Message-ID` is reported
/// and synthesized at the end of the field list.
pub fn normalize_headers(
    mut headers: ParsedHeaders,
    msg_index: usize,
) -> (String, Vec<ValidationResult>) {
    let mut results = Vec::new();

    for name in ["From", "Date"] {
        if !headers.contains(name) {
            results.push(ValidationResult::missing(msg_index, name));
        }
    }

    if !headers.contains("Message-ID") {
        results.push(ValidationResult::missing(msg_index, "Message-ID"));
        let message_id = synthesize_message_id(&headers);
        debug!(msg_index, %message_id, "Adding Message-ID");
        headers.push(HeaderField::new("Message-ID", message_id));
    }

    (headers.rebuild(), results)
}

/// Normalize one raw message: rebuild its headers and reassemble
/// `envelope + "\n" + headers + "\n" + body`.
///
/// A header block that is not UTF-8 was read as Windows-1252 and is written
/// back in that encoding, so 8-bit header bytes come out unchanged.
pub fn normalize_message(raw: &[u8], msg_index: usize) -> (Vec<u8>, Vec<ValidationResult>) {
    let message = Message::split(raw);
    let (header_text, results) = normalize_headers(message.headers(), msg_index);
    let header_bytes: Cow<'_, [u8]> = if std::str::from_utf8(message.header_block).is_ok() {
        Cow::Borrowed(header_text.as_bytes())
    } else {
        let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode(&header_text);
        Cow::Owned(encoded.into_owned())
    };
    let rebuilt = Message::assemble(message.envelope_line, &header_bytes, message.body);
    (rebuilt, results)
}
