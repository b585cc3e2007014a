//! Message-ID synthesis for messages that lack one.

use chrono::{DateTime, Utc};
use uuid::{NoContext, Timestamp, Uuid};

use crate::parser::date::parse_rfc5322_date;
use crate::parser::header::HeaderAccess;

/// Domain part of every synthesized Message-ID.
pub const MESSAGE_ID_DOMAIN: &str = "mboxfix";

/// Build `<uuid@mboxfix>` for a message.
///
/// The UUID is a v7 seeded with the message's `Date` when that parses, so
/// ids sort with the mail they belong to. Otherwise a random v4 is used.
pub fn synthesize_message_id(headers: &dyn HeaderAccess) -> String {
    let timestamp = headers
        .get("Date")
        .and_then(|date| parse_rfc5322_date(&date));
    let uuid = match timestamp {
        Some(ts) => uuid_v7_at(ts).unwrap_or_else(Uuid::new_v4),
        None => Uuid::new_v4(),
    };
    format!("<{uuid}@{MESSAGE_ID_DOMAIN}>")
}

/// A v7 UUID whose first 48 bits hold the Unix millisecond value of `ts`.
///
/// Instants before 1970 cannot be encoded and return `None`.
pub fn uuid_v7_at(ts: DateTime<Utc>) -> Option<Uuid> {
    let secs = u64::try_from(ts.timestamp()).ok()?;
    let nanos = ts.timestamp_subsec_nanos();
    Some(Uuid::new_v7(Timestamp::from_unix(NoContext, secs, nanos)))
}
