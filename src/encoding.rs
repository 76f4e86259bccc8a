//! Character encoding detection and transcoding of fetched bodies.
//!
//! Render-service responses and PDF landing pages are decoded using the
//! `Content-Type` header charset first, then an in-document `<meta>` charset
//! declaration, and finally UTF-8 with lossy replacement.

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;

/// Match `<meta charset="...">` and the `charset=` inside a meta http-equiv content.
#[allow(clippy::expect_used)]
static CHARSET_META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([^"'\s;>]+)"#).expect("valid regex")
});

/// Match `charset=` parameter of a `Content-Type` header value.
#[allow(clippy::expect_used)]
static HEADER_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).expect("valid regex")
});

/// Encoding named by a `Content-Type` header value, if any and recognized.
#[must_use]
pub fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    HEADER_CHARSET_RE
        .captures(content_type)
        .and_then(|c| c.get(1))
        .and_then(|m| Encoding::for_label(m.as_str().as_bytes()))
}

/// Detect character encoding from `<meta>` declarations in the first 1024 bytes.
///
/// Defaults to UTF-8 if no recognized declaration is found.
#[must_use]
pub fn detect_encoding(html: &[u8]) -> &'static Encoding {
    let head = &html[..html.len().min(1024)];
    let head_str = String::from_utf8_lossy(head);

    extract_charset(&head_str)
        .and_then(|charset| Encoding::for_label(charset.as_bytes()))
        .unwrap_or(UTF_8)
}

fn extract_charset(html: &str) -> Option<String> {
    CHARSET_META_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Decode a response body to UTF-8.
///
/// # Examples
///
/// ```
/// use rs_product_extract::encoding::decode_body;
///
/// let body = b"<p>Caf\xE9</p>";
/// assert_eq!(decode_body(body, Some("text/html; charset=ISO-8859-1")), "<p>Café</p>");
/// assert_eq!(decode_body(b"<p>plain</p>", None), "<p>plain</p>");
/// ```
#[must_use]
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from_content_type)
        .unwrap_or_else(|| detect_encoding(body));

    if encoding == UTF_8 {
        return String::from_utf8_lossy(body).into_owned();
    }

    let (decoded, _encoding_used, _had_errors) = encoding.decode(body);
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_windows1252_from_meta_charset() {
        let html = br#"<html><head><meta charset="windows-1252"></head><body>Test</body></html>"#;
        assert_eq!(detect_encoding(html).name(), "windows-1252");
    }

    #[test]
    fn detect_charset_from_http_equiv() {
        let html = br#"<meta http-equiv="Content-Type" content="text/html; charset=ISO-8859-1">"#;
        // encoding_rs maps ISO-8859-1 to windows-1252 per WHATWG
        assert_eq!(detect_encoding(html).name(), "windows-1252");
    }

    #[test]
    fn default_to_utf8_when_no_charset() {
        assert_eq!(detect_encoding(b"<html><body>Test</body></html>"), UTF_8);
    }

    #[test]
    fn header_charset_wins_over_meta() {
        let body = b"<meta charset=\"utf-8\"><p>\x93Hi\x94</p>";
        let decoded = decode_body(body, Some("text/html; charset=windows-1252"));
        assert!(decoded.contains("\u{201C}Hi\u{201D}"));
    }

    #[test]
    fn unknown_header_charset_falls_back_to_meta() {
        let body = b"<meta charset=\"windows-1252\"><p>Caf\xE9</p>";
        let decoded = decode_body(body, Some("text/html; charset=bogus"));
        assert!(decoded.contains("Café"));
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let decoded = decode_body(b"<p>Test \xFF\xFE Invalid</p>", None);
        assert!(decoded.contains("Test"));
        assert!(decoded.contains("Invalid"));
    }
}
