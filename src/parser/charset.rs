//! Charset conversion for body parts and encoded-words.

use tracing::warn;

/// Decode bytes using a named charset.
///
/// Unknown or unsupported charset names fall back to lossy UTF-8; decoding
/// never fails.
pub fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    let label = charset.trim().trim_matches('"');
    if label.is_empty() || label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8")
    {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    match encoding_rs::Encoding::for_label(label.as_bytes()) {
        Some(encoding) => {
            let (decoded, _, _) = encoding.decode(bytes);
            decoded.into_owned()
        }
        None => {
            warn!(charset = label, "Unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_passthrough() {
        assert_eq!(decode_charset("UTF-8", "héllo".as_bytes()), "héllo");
        assert_eq!(decode_charset("", b"plain"), "plain");
    }

    #[test]
    fn test_latin1() {
        assert_eq!(decode_charset("iso-8859-1", b"caf\xe9"), "café");
    }

    #[test]
    fn test_iso_2022_jp() {
        // "テスト"
        let bytes = b"\x1b$B%F%9%H\x1b(B";
        assert_eq!(decode_charset("ISO-2022-JP", bytes), "テスト");
    }

    #[test]
    fn test_unknown_charset_falls_back_to_utf8() {
        assert_eq!(decode_charset("x-klingon", "qapla'".as_bytes()), "qapla'");
    }

    #[test]
    fn test_quoted_label() {
        assert_eq!(decode_charset("\"windows-1252\"", b"M\xfcller"), "Müller");
    }
}
