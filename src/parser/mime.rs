//! MIME body decoding: multipart walk, transfer encodings, charsets and
//! attachment listing.
//!
//! The walk is best effort. A part that cannot be parsed is logged and
//! skipped; decoding carries on with its siblings.

use std::collections::HashMap;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use tracing::{debug, warn};

use crate::config::ParserConfig;
use crate::model::mail::EmailContent;
use crate::parser::charset::decode_charset;
use crate::parser::encoded_word::{decode_encoded_words, hex_pair};
use crate::parser::header::{decode_header_bytes, HeaderAccess, ParsedHeaders};

/// Default limit for nested multiparts (adversarial input protection).
pub const MAX_DEPTH: usize = 10;

const TEXT_PLAIN: &str = "text/plain";
const TEXT_HTML: &str = "text/html";

/// A media type (`Content-Type`) or disposition (`Content-Disposition`)
/// value with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// Lowercased value, e.g. `text/plain` or `attachment`.
    pub value: String,
    /// Parameters keyed by lowercased name, values unquoted.
    pub params: HashMap<String, String>,
}

impl MediaType {
    /// Parse `value; key=val; key="quoted val"`.
    ///
    /// Returns `None` when the value is empty, contains whitespace, or has a
    /// slash with an empty side. Malformed parameters are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut segments = split_params(raw).into_iter();
        let value = segments.next()?.trim().to_lowercase();
        if value.is_empty() || value.contains(char::is_whitespace) {
            return None;
        }
        if let Some((main, sub)) = value.split_once('/') {
            if main.is_empty() || sub.is_empty() || sub.contains('/') {
                return None;
            }
        }

        let mut params = HashMap::new();
        let mut extended = HashMap::new();
        for segment in segments {
            let Some((key, val)) = segment.split_once('=') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let val = unquote(val.trim());
            if key.is_empty() {
                continue;
            }
            match key.strip_suffix('*') {
                Some(base) => {
                    if let Some(decoded) = decode_rfc2231(&val) {
                        extended.insert(base.to_string(), decoded);
                    }
                }
                None => {
                    params.entry(key).or_insert(val);
                }
            }
        }
        for (key, val) in extended {
            params.entry(key).or_insert(val);
        }

        Some(Self { value, params })
    }

    /// A parameter by (lowercase) name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    fn text_plain() -> Self {
        Self {
            value: TEXT_PLAIN.to_string(),
            params: HashMap::new(),
        }
    }
}

/// One body part of a multipart entity.
struct Part<'a> {
    headers: ParsedHeaders,
    body: &'a [u8],
}

/// Decode a message body into its primary text/HTML bodies and attachments.
///
/// Multiparts nested deeper than `config.max_mime_depth` are skipped. Text
/// parts without a `charset` parameter use `config.default_charset`.
pub fn decode_body(
    headers: &dyn HeaderAccess,
    body: &[u8],
    config: &ParserConfig,
) -> EmailContent {
    let mut content = EmailContent::default();
    process_entity(headers, body, 0, config, &mut content);

    let has_text = !content.body_text.is_empty();
    let has_html = content.body_html.as_deref().is_some_and(|h| !h.is_empty());
    content.has_alternate = has_text && has_html;
    content
}

fn process_entity(
    headers: &dyn HeaderAccess,
    body: &[u8],
    depth: usize,
    config: &ParserConfig,
    content: &mut EmailContent,
) {
    let content_type = headers
        .get("Content-Type")
        .and_then(|raw| MediaType::parse(&raw))
        .filter(|mt| mt.value.contains('/'))
        .unwrap_or_else(MediaType::text_plain);

    if content_type.value.starts_with("multipart/") {
        if depth >= config.max_mime_depth {
            warn!(depth, "Multipart nesting too deep, skipping part");
            return;
        }
        let Some(boundary) = content_type.param("boundary").filter(|b| !b.is_empty()) else {
            warn!(content_type = %content_type.value, "Multipart without boundary, skipping");
            return;
        };
        let Some(parts) = split_multipart(body, boundary) else {
            warn!(boundary, "No multipart boundary found in body, skipping");
            return;
        };
        for part in parts {
            process_entity(&part.headers, part.body, depth + 1, config, content);
        }
        return;
    }

    if let Some(disposition) = headers
        .get("Content-Disposition")
        .and_then(|raw| MediaType::parse(&raw))
    {
        if disposition.value == "attachment" {
            let filename = disposition
                .param("filename")
                .or_else(|| content_type.param("name"))
                .unwrap_or_default();
            content.attachments.push(decode_encoded_words(filename));
            return;
        }
    }

    let is_plain = content_type.value == TEXT_PLAIN;
    let is_html = content_type.value == TEXT_HTML;
    let slot_free = (is_plain && content.body_text.is_empty())
        || (is_html && content.body_html.as_deref().unwrap_or_default().is_empty());
    if !slot_free {
        debug!(content_type = %content_type.value, "Skipping non-primary part");
        return;
    }

    let encoding = headers
        .get("Content-Transfer-Encoding")
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let Some(payload) = decode_transfer_encoding(&encoding, body) else {
        warn!(encoding = %encoding, "Undecodable part body, skipping");
        return;
    };

    let charset = content_type
        .param("charset")
        .unwrap_or(config.default_charset.as_str());
    let text = decode_charset(charset, &payload);
    // Plain text is the primary type once captured, even when empty.
    if is_plain || content.body_type.is_empty() {
        content.body_type = content_type.value.clone();
    }
    if is_plain {
        content.body_text = text;
    } else {
        content.body_html = Some(text);
    }
}

/// Undo a `Content-Transfer-Encoding`. `7bit`, `8bit`, `binary` and unknown
/// values pass through.
pub fn decode_transfer_encoding(encoding: &str, body: &[u8]) -> Option<Vec<u8>> {
    match encoding {
        "base64" => decode_base64(body),
        "quoted-printable" => Some(decode_quoted_printable(body)),
        _ => Some(body.to_vec()),
    }
}

/// Decode base64, ignoring line breaks and other whitespace.
fn decode_base64(body: &[u8]) -> Option<Vec<u8>> {
    let cleaned: Vec<u8> = body
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(&cleaned)
        .or_else(|_| {
            let end = cleaned
                .iter()
                .rposition(|&b| b != b'=')
                .map_or(0, |p| p + 1);
            STANDARD_NO_PAD.decode(&cleaned[..end])
        })
        .ok()
}

/// Decode quoted-printable (RFC 2045 §6.7).
///
/// Soft line breaks are removed, trailing whitespace on each line is
/// dropped, and malformed `=` escapes are kept literally.
pub fn decode_quoted_printable(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());

    for line in body.split_inclusive(|&b| b == b'\n') {
        let (content, terminator) = match line.strip_suffix(b"\r\n") {
            Some(c) => (c, &b"\r\n"[..]),
            None => match line.strip_suffix(b"\n") {
                Some(c) => (c, &b"\n"[..]),
                None => (line, &b""[..]),
            },
        };
        let end = content
            .iter()
            .rposition(|&b| b != b' ' && b != b'\t')
            .map_or(0, |p| p + 1);
        let content = &content[..end];

        let (content, soft_break) = match content.strip_suffix(b"=") {
            Some(c) => (c, true),
            None => (content, false),
        };

        let mut i = 0;
        while i < content.len() {
            if content[i] == b'=' {
                let hi = content.get(i + 1).copied();
                if let Some(byte) = hex_pair(hi, content.get(i + 2).copied()) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
            out.push(content[i]);
            i += 1;
        }

        if !soft_break {
            out.extend_from_slice(terminator);
        }
    }

    out
}

/// Cut a multipart body into parts.
///
/// Delimiter lines are `--boundary` and the closing `--boundary--`, with
/// `\n` or `\r\n` endings. The line break before a delimiter belongs to the
/// delimiter. A body that ends without the closing delimiter still yields
/// its last part. Returns `None` when no delimiter is present at all.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Option<Vec<Part<'a>>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let mut parts = Vec::new();
    let mut part_start: Option<usize> = None;
    let mut offset = 0;
    let mut found = false;

    for line in body.split_inclusive(|&b| b == b'\n') {
        let line_start = offset;
        offset += line.len();

        let trimmed = trim_line_end(line);
        let Some(rest) = trimmed.strip_prefix(delimiter) else {
            continue;
        };
        let closing = rest.starts_with(b"--");
        if !closing && !rest.iter().all(|b| *b == b' ' || *b == b'\t') {
            continue;
        }
        found = true;

        if let Some(start) = part_start.take() {
            let end = strip_trailing_newline(body, start, line_start);
            parts.push(parse_part(&body[start..end]));
        }
        if closing {
            return Some(parts);
        }
        part_start = Some(offset);
    }

    if let Some(start) = part_start {
        debug!(boundary, "Multipart body ends without closing delimiter");
        parts.push(parse_part(&body[start..]));
    }

    found.then_some(parts)
}

/// End of a part: `line_start` minus the `\n` or `\r\n` right before it.
fn strip_trailing_newline(body: &[u8], start: usize, line_start: usize) -> usize {
    let mut end = line_start;
    if end > start && body[end - 1] == b'\n' {
        end -= 1;
        if end > start && body[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end
}

/// Line without its terminator and trailing whitespace.
fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |p| p + 1);
    &line[..end]
}

/// Split a part into its headers and body at the first blank line.
fn parse_part(raw: &[u8]) -> Part<'_> {
    let mut offset = 0;
    for line in raw.split_inclusive(|&b| b == b'\n') {
        if trim_line_end(line).is_empty() && (line.ends_with(b"\n") || line.is_empty()) {
            let headers = ParsedHeaders::parse(&decode_header_bytes(&raw[..offset]));
            return Part {
                headers,
                body: &raw[offset + line.len()..],
            };
        }
        offset += line.len();
    }
    // Headers only, no body.
    Part {
        headers: ParsedHeaders::parse(&decode_header_bytes(raw)),
        body: &raw[raw.len()..],
    }
}

/// Split a header value at `;` outside quoted strings.
fn split_params(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, ch) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}

/// Remove surrounding quotes and backslash escapes.
fn unquote(val: &str) -> String {
    let Some(inner) = val
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .filter(|_| val.len() >= 2)
    else {
        return val.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Decode an RFC 2231 extended value: `charset'lang'percent-encoded`.
fn decode_rfc2231(val: &str) -> Option<String> {
    let mut pieces = val.splitn(3, '\'');
    let charset = pieces.next()?;
    let _language = pieces.next()?;
    let encoded = pieces.next()?;

    let bytes = encoded.as_bytes();
    let mut raw = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(byte) = hex_pair(bytes.get(i + 1).copied(), bytes.get(i + 2).copied()) {
                raw.push(byte);
                i += 3;
                continue;
            }
        }
        raw.push(bytes[i]);
        i += 1;
    }
    Some(decode_charset(charset, &raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(headers: &str, body: &str) -> EmailContent {
        decode_body(
            &ParsedHeaders::parse(headers),
            body.as_bytes(),
            &ParserConfig::default(),
        )
    }

    #[test]
    fn test_media_type_parse() {
        let mt = MediaType::parse("Text/Plain; charset=\"ISO-8859-1\"; format=flowed").unwrap();
        assert_eq!(mt.value, "text/plain");
        assert_eq!(mt.param("charset"), Some("ISO-8859-1"));
        assert_eq!(mt.param("format"), Some("flowed"));
    }

    #[test]
    fn test_media_type_quoted_semicolon() {
        let mt = MediaType::parse("attachment; filename=\"a;b.txt\"").unwrap();
        assert_eq!(mt.value, "attachment");
        assert_eq!(mt.param("filename"), Some("a;b.txt"));
    }

    #[test]
    fn test_media_type_rejects_garbage() {
        assert!(MediaType::parse("").is_none());
        assert!(MediaType::parse("text/").is_none());
        assert!(MediaType::parse("not a type").is_none());
    }

    #[test]
    fn test_rfc2231_filename() {
        let mt = MediaType::parse("attachment; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf").unwrap();
        assert_eq!(mt.param("filename"), Some("résumé.pdf"));
    }

    #[test]
    fn test_plain_message_defaults() {
        let content = decode("Subject: s\n", "hello\n");
        assert_eq!(content.body_text, "hello\n");
        assert_eq!(content.body_type, "text/plain");
        assert!(!content.has_alternate);
    }

    #[test]
    fn test_bad_content_type_defaults_to_plain() {
        let content = decode("Content-Type: garbage here\n", "still text\n");
        assert_eq!(content.body_text, "still text\n");
    }

    #[test]
    fn test_empty_plain_part_sets_body_type() {
        let content = decode("Content-Type: text/plain\n", "");
        assert!(content.body_text.is_empty());
        assert_eq!(content.body_type, "text/plain");
    }

    #[test]
    fn test_plain_after_html_is_primary() {
        let headers = "Content-Type: multipart/alternative; boundary=b\n";
        let body = "--b\nContent-Type: text/html\n\n<p>x</p>\n--b\nContent-Type: text/plain\n\nx\n--b--\n";
        let content = decode(headers, body);
        assert_eq!(content.body_type, "text/plain");
        assert!(content.has_alternate);
    }

    #[test]
    fn test_html_only() {
        let content = decode("Content-Type: text/html\n", "<p>hi</p>");
        assert_eq!(content.body_html.as_deref(), Some("<p>hi</p>"));
        assert_eq!(content.body_type, "text/html");
        assert!(content.body_text.is_empty());
    }

    #[test]
    fn test_multipart_alternative() {
        let headers = "Content-Type: multipart/alternative; boundary=\"XYZ\"\n";
        let body = "preamble\n--XYZ\nContent-Type: text/plain\n\nplain body\n--XYZ\n\
Content-Type: text/html\n\n<b>html body</b>\n--XYZ--\nepilogue\n";
        let content = decode(headers, body);
        assert_eq!(content.body_text, "plain body");
        assert_eq!(content.body_html.as_deref(), Some("<b>html body</b>"));
        assert!(content.has_alternate);
        assert_eq!(content.body_type, "text/plain");
    }

    #[test]
    fn test_attachment_never_becomes_body() {
        let headers = "Content-Type: multipart/mixed; boundary=b1\n";
        let body = "--b1\nContent-Type: text/plain\nContent-Disposition: attachment; filename=\"a.txt\"\n\n\
attached text\n--b1--\n";
        let content = decode(headers, body);
        assert_eq!(content.attachments, vec!["a.txt".to_string()]);
        assert!(content.body_text.is_empty());
        assert!(content.body_html.is_none());
        assert_eq!(content.body_type, "");
    }

    #[test]
    fn test_nested_multipart_first_wins() {
        let headers = "Content-Type: multipart/mixed; boundary=outer\n";
        let body = "--outer\r\nContent-Type: multipart/alternative; boundary=inner\r\n\r\n\
--inner\r\nContent-Type: text/plain; charset=iso-8859-1\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\n\
caf=E9 =\r\nau lait\r\n--inner\r\nContent-Type: text/html\r\n\r\n<p>first</p>\r\n--inner--\r\n\
--outer\r\nContent-Type: text/plain\r\n\r\nsecond plain\r\n\
--outer\r\nContent-Type: application/pdf\r\nContent-Disposition: attachment; filename=doc.pdf\r\n\
Content-Transfer-Encoding: base64\r\n\r\nJVBERi0=\r\n--outer--\r\n";
        let content = decode(headers, body);
        assert_eq!(content.body_text, "café au lait");
        assert_eq!(content.body_html.as_deref(), Some("<p>first</p>"));
        assert_eq!(content.attachments, vec!["doc.pdf".to_string()]);
        assert!(content.has_alternate);
    }

    #[test]
    fn test_base64_body() {
        let content = decode(
            "Content-Type: text/plain; charset=utf-8\nContent-Transfer-Encoding: base64\n",
            "SG9sYSBt\ndW5kbw==\n",
        );
        assert_eq!(content.body_text, "Hola mundo");
    }

    #[test]
    fn test_broken_base64_part_is_skipped() {
        let headers = "Content-Type: multipart/mixed; boundary=b\n";
        let body = "--b\nContent-Type: text/plain\nContent-Transfer-Encoding: base64\n\n!!!not base64!!!\n\
--b\nContent-Type: text/plain\n\nfallback\n--b--\n";
        let content = decode(headers, body);
        assert_eq!(content.body_text, "fallback");
    }

    #[test]
    fn test_multipart_without_boundary_param() {
        let content = decode("Content-Type: multipart/mixed\n", "whatever\n");
        assert_eq!(content, EmailContent::default());
    }

    #[test]
    fn test_missing_closing_delimiter() {
        let headers = "Content-Type: multipart/mixed; boundary=b\n";
        let body = "--b\nContent-Type: text/plain\n\ntruncated part\n";
        let content = decode(headers, body);
        assert_eq!(content.body_text, "truncated part\n");
    }

    #[test]
    fn test_depth_limit() {
        let headers = ParsedHeaders::parse("Content-Type: multipart/mixed; boundary=b0\n");
        let mut body = String::new();
        for level in 1..=3 {
            body.push_str(&format!(
                "--b{}\nContent-Type: multipart/mixed; boundary=b{level}\n\n",
                level - 1
            ));
        }
        body.push_str("--b3\nContent-Type: text/plain\n\ndeep\n--b3--\n");
        let shallow_limit = ParserConfig {
            max_mime_depth: 2,
            ..ParserConfig::default()
        };
        let deep = decode_body(&headers, body.as_bytes(), &shallow_limit);
        assert!(deep.body_text.is_empty());
        let shallow = decode_body(&headers, body.as_bytes(), &ParserConfig::default());
        assert_eq!(shallow.body_text, "deep");
    }

    #[test]
    fn test_unknown_charset_falls_back() {
        let content = decode("Content-Type: text/plain; charset=x-unknown\n", "abc");
        assert_eq!(content.body_text, "abc");
    }

    #[test]
    fn test_quoted_printable() {
        assert_eq!(decode_quoted_printable(b"a=3Db  \nsoft=\nbreak"), b"a=b\nsoftbreak");
        assert_eq!(decode_quoted_printable(b"bad=ZZ"), b"bad=ZZ");
    }
}
