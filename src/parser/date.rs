//! Email date parsing.
//!
//! [`parse_rfc5322_date`] is the grammar used for validation and Message-ID
//! synthesis: RFC 5322 plus a handful of layouts that real mailers emit.
//! [`parse_date`] is used for sorting listings and adds `mail-parser`'s
//! lenient parser as a last resort.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

/// Layouts tried after RFC 2822 (day-of-week already stripped).
const FALLBACK_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%d %b %y %H:%M:%S %z",
    "%d %b %y %H:%M %z",
    "%d-%b-%y %H:%M:%S %z",
    "%d-%b-%Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S",
    "%b %d %H:%M:%S %Y",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse a `Date:` value in RFC 5322 form or a common fallback layout
/// (RFC 1123, RFC 822, RFC 850, RFC 3339, named zones, trailing comments).
pub fn parse_rfc5322_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let cleaned = strip_trailing_comment(trimmed);
    if cleaned != trimmed {
        if let Ok(dt) = DateTime::parse_from_rfc2822(cleaned) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let candidate = replace_named_tz(strip_day_of_week(cleaned));
    for fmt in FALLBACK_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&candidate, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&candidate, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    None
}

/// Parse a date for display and sorting, accepting anything `mail-parser`
/// can make sense of when the stricter grammar fails.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    if let Some(dt) = parse_rfc5322_date(date_str) {
        return Some(dt);
    }

    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = mail_parser_date(trimmed);
    if parsed.is_none() {
        debug!(date = trimmed, "Could not parse date");
    }
    parsed
}

/// Attempt to parse a date using `mail-parser`'s built-in parser.
fn mail_parser_date(input: &str) -> Option<DateTime<Utc>> {
    use mail_parser::MessageParser;

    // Wrap input in a minimal RFC 5322 message so mail-parser can parse it
    let fake_msg = format!("Date: {input}\n\n");
    let parsed = MessageParser::default().parse(fake_msg.as_bytes())?;
    let date = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&date)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Drop a trailing `(comment)`, e.g. `"+0000 (UTC)"`.
fn strip_trailing_comment(s: &str) -> &str {
    if s.ends_with(')') {
        if let Some(open) = s.rfind('(') {
            return s[..open].trim_end();
        }
    }
    s
}

/// Strip a leading day-of-week, short or long, with or without comma.
fn strip_day_of_week(s: &str) -> &str {
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    let Some(first) = s.split_whitespace().next() else {
        return s;
    };
    let word = first.trim_end_matches(',');
    let is_day = word.len() >= 3
        && DAYS
            .iter()
            .any(|d| word.get(..3).is_some_and(|p| p.eq_ignore_ascii_case(d)))
        && word.chars().all(|c| c.is_ascii_alphabetic());
    if is_day {
        s[first.len()..].trim_start()
    } else {
        s
    }
}

/// Replace a trailing timezone abbreviation with a numeric offset.
fn replace_named_tz(s: &str) -> String {
    const TZS: [(&str, &str); 14] = [
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("UT", "+0000"),
        ("CEST", "+0200"),
        ("CET", "+0100"),
        ("JST", "+0900"),
    ];
    if let Some((head, last)) = s.rsplit_once(' ') {
        if let Some((_, offset)) = TZS.iter().find(|(name, _)| *name == last) {
            return format!("{head} {offset}");
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc2822() {
        let dt = parse_rfc5322_date("Thu, 04 Jan 2024 10:00:00 +0000").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-04 10:00");
    }

    #[test]
    fn test_without_day_of_week() {
        assert!(parse_rfc5322_date("04 Jan 2024 10:00:00 +0000").is_some());
    }

    #[test]
    fn test_trailing_comment() {
        let dt = parse_rfc5322_date("Tue, 01 Jan 2019 00:00:00 +0000 (UTC)").unwrap();
        assert_eq!(dt.timestamp_millis(), 1_546_300_800_000);
    }

    #[test]
    fn test_named_timezone() {
        let dt = parse_rfc5322_date("Thu, 04 Jan 2024 10:00:00 EST").unwrap();
        assert_eq!(dt.format("%H").to_string(), "15");
    }

    #[test]
    fn test_rfc850() {
        assert!(parse_rfc5322_date("Monday, 02-Jan-06 15:04:05 GMT").is_some());
    }

    #[test]
    fn test_rfc3339() {
        assert!(parse_rfc5322_date("2024-01-04T10:00:00Z").is_some());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse_rfc5322_date("").is_none());
        assert!(parse_rfc5322_date("not a date").is_none());
        assert!(parse_rfc5322_date("Tue, 32 Foo 2019").is_none());
    }

    #[test]
    fn test_strip_day_of_week() {
        assert_eq!(strip_day_of_week("Thu, 04 Jan 2024"), "04 Jan 2024");
        assert_eq!(strip_day_of_week("Monday, 02-Jan-06"), "02-Jan-06");
        assert_eq!(strip_day_of_week("04 Jan 2024"), "04 Jan 2024");
    }

    #[test]
    fn test_lenient_parse_accepts_strict_dates() {
        assert_eq!(
            parse_date("Thu, 04 Jan 2024 10:00:00 +0000"),
            parse_rfc5322_date("Thu, 04 Jan 2024 10:00:00 +0000")
        );
    }
}
