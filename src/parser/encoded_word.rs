//! RFC 2047 encoded-word decoding for display values (subjects, names).

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;

use super::charset::decode_charset;

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Whitespace between two adjacent encoded-words is dropped (RFC 2047 §6.2).
/// A token that fails to decode is kept verbatim.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];
        match decode_one_word(after_start) {
            Some((text, consumed)) => {
                result.push_str(&text);
                remaining = &after_start[consumed..];
                last_was_encoded = true;
            }
            None => {
                result.push_str("=?");
                remaining = after_start;
                last_was_encoded = false;
            }
        }
    }

    result.push_str(remaining);
    result
}

/// Decode `charset?encoding?text?=` (the part after `=?`).
///
/// Returns the decoded text and the number of bytes consumed.
fn decode_one_word(s: &str) -> Option<(String, usize)> {
    let (charset, rest) = s.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let encoded_text = &rest[..end];

    if charset.contains(char::is_whitespace) || encoded_text.contains(char::is_whitespace) {
        return None;
    }

    let bytes = match encoding {
        "B" | "b" => STANDARD
            .decode(encoded_text)
            .or_else(|_| STANDARD_NO_PAD.decode(encoded_text.trim_end_matches('=')))
            .ok()?,
        "Q" | "q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    let consumed = charset.len() + 1 + encoding.len() + 1 + end + 2;
    // RFC 2231 language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);
    Some((decode_charset(charset, &bytes), consumed))
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' => {
                match hex_pair(bytes.get(i + 1).copied(), bytes.get(i + 2).copied()) {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Combine two ASCII hex digits into a byte.
pub(crate) fn hex_pair(hi: Option<u8>, lo: Option<u8>) -> Option<u8> {
    let hi = (hi? as char).to_digit(16)?;
    let lo = (lo? as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_encoded_word() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SG9sYSBtdW5kbw==?="), "Hola mundo");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_adjacent_words_join_without_space() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= there";
        assert_eq!(decode_encoded_words(input), "Re: Hola there");
    }

    #[test]
    fn test_japanese_iso_2022_jp() {
        // "テスト" in ISO-2022-JP, base64
        let input = "=?ISO-2022-JP?B?GyRCJUYlOSVIGyhC?=";
        assert_eq!(decode_encoded_words(input), "テスト");
    }

    #[test]
    fn test_broken_word_kept_verbatim() {
        assert_eq!(decode_encoded_words("=?UTF-8?X?abc?="), "=?UTF-8?X?abc?=");
        assert_eq!(decode_encoded_words("price =? unknown"), "price =? unknown");
    }

    #[test]
    fn test_plain_passthrough() {
        assert_eq!(decode_encoded_words("Normal subject"), "Normal subject");
    }

    #[test]
    fn test_q_underscore_and_trailing_equals() {
        assert_eq!(decode_encoded_words("=?UTF-8?Q?a_b=?="), "a b=");
    }
}
