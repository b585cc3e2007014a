//! Email address parsing and address-list grammar checks (RFC 5322 §3.4).

use crate::parser::encoded_word::decode_encoded_words;

/// A parsed email address.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `display_name = "Juan García"`, `address = "juan@ejemplo.com"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, serde::Serialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Parse one mailbox, `Name <addr>` or a bare `addr`.
    ///
    /// Returns `None` when the text does not follow the mailbox grammar.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = strip_comments(raw);
        let trimmed = trimmed.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(angle_start) = find_unquoted(trimmed, '<') {
            let inner = trimmed[angle_start + 1..].strip_suffix('>')?;
            let address = inner.trim();
            let name_part = trimmed[..angle_start].trim();
            if !is_valid_addr_spec(address) || !is_valid_phrase(name_part) {
                return None;
            }
            return Some(Self {
                display_name: decode_encoded_words(&strip_quotes(name_part)),
                address: address.to_string(),
            });
        }

        is_valid_addr_spec(trimmed).then(|| Self {
            display_name: String::new(),
            address: trimmed.to_string(),
        })
    }

    /// Parse a comma-separated address list, group syntax included.
    ///
    /// Handles quoted commas: `"Last, First" <a@b.com>, other@c.com`.
    /// Returns `None` if any member is malformed or the list is empty.
    pub fn parse_list(raw: &str) -> Option<Vec<Self>> {
        let mut results = Vec::new();
        let mut any_group = false;

        for item in split_top_level(raw, ',') {
            let item = item.trim();
            if item.is_empty() {
                return None;
            }
            // `Group: a@x, b@y;` arrives split at the commas.
            let (group_open, rest) = match find_unquoted(item, ':') {
                Some(pos) if find_unquoted(item, '<').is_none_or(|lt| pos < lt) => {
                    if !is_valid_phrase(&item[..pos]) || item[..pos].trim().is_empty() {
                        return None;
                    }
                    any_group = true;
                    (true, item[pos + 1..].trim())
                }
                _ => (false, item),
            };
            let member = rest.strip_suffix(';').unwrap_or(rest).trim();
            if member.is_empty() && group_open {
                continue;
            }
            results.push(Self::parse(member)?);
        }

        if results.is_empty() && !any_group {
            return None;
        }
        Some(results)
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Whether a header value is a well-formed address list.
pub fn is_valid_address_list(raw: &str) -> bool {
    EmailAddress::parse_list(raw).is_some()
}

/// Render a `From:`/`To:` value for display: decoded names joined as
/// `Name <addr>, addr`. Falls back to decoding the whole value when the
/// list does not parse.
pub fn decode_address_list(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    match EmailAddress::parse_list(raw) {
        Some(list) => list
            .iter()
            .map(EmailAddress::display)
            .collect::<Vec<_>>()
            .join(", "),
        None => decode_encoded_words(raw),
    }
}

/// Split on `sep` outside quotes, angle brackets and comments.
fn split_top_level(raw: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut angle = 0usize;
    let mut comment = 0usize;
    let mut start = 0;

    for (i, ch) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes || comment > 0 => escaped = true,
            '"' if comment == 0 => in_quotes = !in_quotes,
            '(' if !in_quotes => comment += 1,
            ')' if !in_quotes && comment > 0 => comment -= 1,
            '<' if !in_quotes && comment == 0 => angle += 1,
            '>' if !in_quotes && comment == 0 && angle > 0 => angle -= 1,
            c if c == sep && !in_quotes && angle == 0 && comment == 0 => {
                parts.push(&raw[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}

/// Byte position of the first `target` outside a quoted string.
fn find_unquoted(s: &str, target: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == target && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// Remove `(comments)` outside quoted strings.
fn strip_comments(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_quotes = false;
    let mut escaped = false;
    let mut depth = 0usize;
    for ch in s.chars() {
        if escaped {
            escaped = false;
            if depth == 0 {
                out.push(ch);
            }
            continue;
        }
        match ch {
            '\\' if in_quotes || depth > 0 => {
                escaped = true;
                if depth == 0 {
                    out.push(ch);
                }
            }
            '"' if depth == 0 => {
                in_quotes = !in_quotes;
                out.push(ch);
            }
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes && depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c) || !c.is_ascii()
}

/// `local@domain` with a dot-atom or quoted local part and a dot-atom or
/// literal domain.
fn is_valid_addr_spec(s: &str) -> bool {
    let Some((local, domain)) = s.rsplit_once('@') else {
        return false;
    };
    let local_ok = if local.len() >= 2 && local.starts_with('"') && local.ends_with('"') {
        !local[1..local.len() - 1].contains('"') || local.contains("\\\"")
    } else {
        is_dot_atom(local)
    };
    let domain_ok = if domain.starts_with('[') && domain.ends_with(']') {
        domain.len() > 2 && !domain[1..domain.len() - 1].contains(['[', ']', '\\'])
    } else {
        is_dot_atom(domain)
    };
    local_ok && domain_ok
}

fn is_dot_atom(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(|atom| !atom.is_empty() && atom.chars().all(is_atext))
}

/// A display name: words of atext, dots and whitespace, or quoted strings.
fn is_valid_phrase(s: &str) -> bool {
    let mut in_quotes = false;
    let mut escaped = false;
    for ch in s.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            c if is_atext(c) || c == '.' || c.is_whitespace() => {}
            _ => return false,
        }
    }
    !in_quotes
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().replace("\\\"", "\"")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("user@example.com").unwrap();
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_angle_address() {
        let addr = EmailAddress::parse("<user@example.com>").unwrap();
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("John Q. Public <jqp@example.com>").unwrap();
        assert_eq!(addr.address, "jqp@example.com");
        assert_eq!(addr.display_name, "John Q. Public");
    }

    #[test]
    fn test_parse_encoded_name() {
        let addr = EmailAddress::parse("=?UTF-8?B?SG9sYQ==?= <a@b.com>").unwrap();
        assert_eq!(addr.display_name, "Hola");
    }

    #[test]
    fn test_parse_list_with_quoted_comma() {
        let list = EmailAddress::parse_list("\"Last, First\" <a@b.com>, other@c.com").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name, "Last, First");
        assert_eq!(list[1].address, "other@c.com");
    }

    #[test]
    fn test_parse_list_with_comment() {
        let list = EmailAddress::parse_list("a@b.com (Alice, at home)").unwrap();
        assert_eq!(list[0].address, "a@b.com");
    }

    #[test]
    fn test_group_syntax() {
        assert!(is_valid_address_list("undisclosed-recipients:;"));
        let list = EmailAddress::parse_list("Team: a@x.org, b@y.org;").unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_invalid_lists() {
        assert!(!is_valid_address_list(""));
        assert!(!is_valid_address_list("not an address"));
        assert!(!is_valid_address_list("a@b.com,"));
        assert!(!is_valid_address_list("Name <missing-at>"));
        assert!(!is_valid_address_list("Bad@Name <a@b.com>"));
        assert!(!is_valid_address_list("a..b@c.com"));
        assert!(!is_valid_address_list("<a@b.com"));
    }

    #[test]
    fn test_domain_literal() {
        assert!(is_valid_address_list("root@[192.168.0.1]"));
    }

    #[test]
    fn test_decode_address_list() {
        assert_eq!(
            decode_address_list("=?UTF-8?B?SG9sYQ==?= <a@b.com>, c@d.com"),
            "Hola <a@b.com>, c@d.com"
        );
        assert_eq!(decode_address_list("=?UTF-8?Q?broken?="), "broken");
        assert_eq!(decode_address_list(""), "");
    }

    #[test]
    fn test_display() {
        let addr = EmailAddress {
            display_name: "Alice".to_string(),
            address: "alice@example.com".to_string(),
        };
        assert_eq!(addr.display(), "Alice <alice@example.com>");
        assert_eq!(addr.to_string(), "Alice <alice@example.com>");
    }
}
