//! RFC 5322 header model: tokenizing with fold tracking, case-insensitive
//! lookup, and rebuilding header text from the parsed fields.

use std::collections::HashMap;

use tracing::warn;

/// Anything that can answer "what is the value of header `name`?".
///
/// Implemented by top-level message headers and by MIME part headers alike,
/// so the body decoder can walk both without caring which one it holds.
pub trait HeaderAccess {
    /// Unfolded value of the first field called `name` (case-insensitive).
    fn get(&self, name: &str) -> Option<String>;
}

/// One header field with its folded continuation lines.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HeaderField {
    /// Field name as written in the message.
    pub name: String,
    /// `values[0]` is the value on the field line, the rest are folded
    /// continuation lines in file order.
    pub values: Vec<String>,
}

impl HeaderField {
    /// A single-line field.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }
}

/// Ordered header fields plus an index of the first occurrence of each name.
///
/// Duplicate names are kept in `fields` and re-emitted by [`rebuild`], but
/// name lookups always resolve to the first occurrence.
///
/// [`rebuild`]: ParsedHeaders::rebuild
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ParsedHeaders {
    fields: Vec<HeaderField>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ParsedHeaders {
    /// Tokenize a header block.
    ///
    /// - A line starting with space or tab continues the currently open field.
    /// - A line with a colon opens a new field (name and value trimmed).
    /// - Any other line is invalid and closes the open field, so indented
    ///   lines after it are dropped instead of attaching to a stale field.
    pub fn parse(text: &str) -> Self {
        let mut fields: Vec<HeaderField> = Vec::new();
        let mut open = false;

        for line in text.lines() {
            if line.starts_with(' ') || line.starts_with('\t') {
                if open {
                    if let Some(field) = fields.last_mut() {
                        field
                            .values
                            .push(line.trim_start_matches([' ', '\t']).to_string());
                    }
                }
            } else if let Some(colon_pos) = line.find(':') {
                fields.push(HeaderField::new(
                    line[..colon_pos].trim(),
                    line[colon_pos + 1..].trim(),
                ));
                open = true;
            } else {
                open = false;
            }
        }

        Self::from_fields(fields)
    }

    /// Build from an already ordered field list.
    pub fn from_fields(fields: Vec<HeaderField>) -> Self {
        let mut headers = Self {
            fields: Vec::with_capacity(fields.len()),
            index: HashMap::new(),
        };
        for field in fields {
            headers.push(field);
        }
        headers
    }

    /// Append a field at the tail.
    pub fn push(&mut self, field: HeaderField) {
        self.index
            .entry(field.name.to_lowercase())
            .or_insert(self.fields.len());
        self.fields.push(field);
    }

    /// Fields in their original order, duplicates included.
    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    /// Whether a field called `name` exists (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    /// First field called `name` (case-insensitive).
    pub fn field(&self, name: &str) -> Option<&HeaderField> {
        self.index
            .get(&name.to_lowercase())
            .and_then(|&i| self.fields.get(i))
    }

    /// Value of the first field called `name`: all values joined with a
    /// single space, trimmed.
    pub fn get_field_value(&self, name: &str) -> Option<String> {
        self.field(name)
            .map(|field| field.values.join(" ").trim().to_string())
    }

    /// Re-emit the header text.
    ///
    /// Each field becomes `Name: values[0]\n` followed by one
    /// `\tvalue\n` line per folded value. Fields without values are skipped.
    pub fn rebuild(&self) -> String {
        let mut out = String::new();

        for field in &self.fields {
            let Some((first, rest)) = field.values.split_first() else {
                warn!(field = %field.name, "Header field without value, skipping");
                continue;
            };

            out.push_str(&field.name);
            out.push_str(": ");
            out.push_str(first);
            out.push('\n');
            for value in rest {
                out.push('\t');
                out.push_str(value);
                out.push('\n');
            }
        }

        out
    }
}

impl HeaderAccess for ParsedHeaders {
    fn get(&self, name: &str) -> Option<String> {
        self.get_field_value(name)
    }
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}
