//! Header validation against RFC 5322.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::address::is_valid_address_list;
use crate::model::mail::{Message, STATUS_DELETED};
use crate::model::validation::ValidationResult;
use crate::parser::date::parse_rfc5322_date;
use crate::parser::header::ParsedHeaders;

/// Headers every message must carry, in report order.
pub const REQUIRED_HEADERS: [&str; 3] = ["From", "Date", "Message-ID"];

/// Check one message's headers.
///
/// Findings come out in a fixed order: missing required headers, then
/// invalid `From`, `Date` and `Message-ID`, then a `Status: D` marker.
pub fn validate_headers(headers: &ParsedHeaders, msg_index: usize) -> Vec<ValidationResult> {
    let mut results: Vec<ValidationResult> = REQUIRED_HEADERS
        .iter()
        .filter(|name| !headers.contains(name))
        .map(|name| ValidationResult::missing(msg_index, name))
        .collect();

    if let Some(from) = headers.get_field_value("From") {
        if !is_valid_address_list(&from) {
            results.push(ValidationResult::invalid(
                msg_index,
                "From",
                "Invalid From address format",
            ));
        }
    }

    if let Some(date) = headers.get_field_value("Date") {
        if parse_rfc5322_date(&date).is_none() {
            results.push(ValidationResult::invalid(
                msg_index,
                "Date",
                "Invalid Date format",
            ));
        }
    }

    if let Some(message_id) = headers.get_field_value("Message-ID") {
        if !is_valid_message_id(&message_id) {
            results.push(ValidationResult::invalid(
                msg_index,
                "Message-ID",
                "Invalid Message-ID format",
            ));
        }
    }

    if headers.get_field_value("Status").as_deref() == Some(STATUS_DELETED) {
        results.push(ValidationResult::deleted(msg_index));
    }

    results
}

/// Validate the headers of one raw message blob.
pub fn validate_message(raw: &[u8], msg_index: usize) -> Vec<ValidationResult> {
    validate_headers(&Message::split(raw).headers(), msg_index)
}

/// `local@domain` with no embedded `<`, `>` or second `@`, brackets optional.
pub fn is_valid_message_id(value: &str) -> bool {
    static MESSAGE_ID: OnceLock<Regex> = OnceLock::new();
    let re = MESSAGE_ID.get_or_init(|| {
        Regex::new(r"^<[^<>@]+@[^<>@]+>$").expect("Message-ID pattern is valid")
    });
    let bare = value.trim_matches(|c| c == '<' || c == '>');
    re.is_match(&format!("<{bare}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::validation::FindingStatus;

    const GOOD: &str = "From: Alice <alice@example.com>\n\
Date: Tue, 01 Jan 2019 00:00:00 +0000\n\
Message-ID: <abc@example.com>\n";

    fn validate(text: &str) -> Vec<ValidationResult> {
        validate_headers(&ParsedHeaders::parse(text), 0)
    }

    #[test]
    fn test_valid_headers() {
        assert!(validate(GOOD).is_empty());
    }

    #[test]
    fn test_missing_headers_in_order() {
        let results = validate("Subject: nothing else\n");
        let fields: Vec<_> = results.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, ["From", "Date", "Message-ID"]);
        assert!(results.iter().all(|r| r.status == FindingStatus::Missing));
    }

    #[test]
    fn test_lowercase_names_are_found() {
        let text = GOOD.to_lowercase().replace("tue, 01 jan", "Tue, 01 Jan");
        assert!(validate(&text).is_empty());
    }

    #[test]
    fn test_invalid_fields() {
        let results = validate(
            "From: not an address\nDate: yesterday-ish\nMessage-ID: <a@b@c>\n",
        );
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.status == FindingStatus::Invalid));
        assert_eq!(results[0].field, "From");
        assert_eq!(results[1].field, "Date");
        assert_eq!(results[2].field, "Message-ID");
    }

    #[test]
    fn test_deleted_status() {
        let results = validate(&format!("{GOOD}Status: D\n"));
        assert_eq!(results, vec![ValidationResult::deleted(0)]);
        assert!(validate(&format!("{GOOD}Status: RO\n")).is_empty());
    }

    #[test]
    fn test_validate_message_blob() {
        let raw = format!("From a@x Mon Jan 1\n{GOOD}Status: D\n\nbody\n");
        let results = validate_message(raw.as_bytes(), 1);
        assert_eq!(results, vec![ValidationResult::deleted(1)]);
    }

    #[test]
    fn test_message_id_grammar() {
        assert!(is_valid_message_id("<abc@example.com>"));
        assert!(is_valid_message_id("abc@example.com"));
        assert!(!is_valid_message_id("<no-at-sign>"));
        assert!(!is_valid_message_id("<a@b@c>"));
        assert!(!is_valid_message_id("<a<b@c>"));
        assert!(!is_valid_message_id(""));
    }
}
