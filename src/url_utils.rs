//! URL Utility Functions
//!
//! Validation, resolution and filename helpers shared by the image, manual
//! and fetch code paths.

use url::Url;

/// Check if a string is a valid absolute http(s) URL with a host.
///
/// # Returns
/// * `(is_absolute, parsed_url)` - Whether URL is absolute and the parsed URL if valid
#[must_use]
pub fn is_absolute_url(s: &str) -> (bool, Option<Url>) {
    let s = s.trim();

    if !s.starts_with("http://") && !s.starts_with("https://") {
        return (false, None);
    }

    match Url::parse(s) {
        Ok(url) if url.host().is_some() => (true, Some(url)),
        _ => (false, None),
    }
}

/// Parse a URL string into a Url object.
///
/// # Returns
/// * `Some(Url)` if valid absolute URL, `None` otherwise
#[must_use]
pub fn parse_url(url_str: &str) -> Option<Url> {
    is_absolute_url(url_str).1
}

/// Resolve a possibly relative reference against `base`.
///
/// Protocol-relative references (`//cdn.example.com/x.jpg`) take the base scheme.
/// Returns `None` for empty input, `data:`/`javascript:`/`mailto:` URLs and
/// anything that does not end up as absolute http(s).
#[must_use]
pub fn resolve(reference: &str, base: Option<&Url>) -> Option<String> {
    let reference = reference.trim();

    if reference.is_empty()
        || reference.starts_with('#')
        || reference.starts_with("data:")
        || reference.starts_with("javascript:")
        || reference.starts_with("mailto:")
        || reference.starts_with("tel:")
    {
        return None;
    }

    if let (true, Some(url)) = is_absolute_url(reference) {
        return Some(url.to_string());
    }

    let joined = match base {
        Some(base) => base.join(reference).ok()?,
        None if reference.starts_with("//") => Url::parse(&format!("https:{reference}")).ok()?,
        None => return None,
    };

    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}

/// Normalize a URL by removing fragments and a trailing path slash.
#[must_use]
pub fn normalize_url(url_str: &str) -> String {
    let Some(mut url) = parse_url(url_str) else {
        return url_str.trim().to_string();
    };

    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(&path[..path.len() - 1]);
    }

    url.to_string()
}

/// Extract filename from a URL, stripping query parameters and fragments.
///
/// # Examples
/// ```
/// use rs_product_extract::url_utils::extract_filename;
///
/// assert_eq!(extract_filename("https://example.com/images/photo.jpg"), "photo.jpg");
/// assert_eq!(extract_filename("https://example.com/images/photo.jpg?v=123"), "photo.jpg");
/// assert_eq!(extract_filename("/path/to/image.png#section"), "image.png");
/// assert_eq!(extract_filename("https://example.com/"), "");
/// ```
#[must_use]
pub fn extract_filename(url: &str) -> String {
    let url = url.trim();

    let without_query = url.split(['?', '#']).next().unwrap_or(url);

    let filename = without_query.rsplit('/').next().unwrap_or("").trim();

    if filename.is_empty() || filename == "." || filename == ".." {
        return String::new();
    }

    filename.to_string()
}

/// Lowercase file extension of the URL path (without the dot), if any.
#[must_use]
pub fn extension(url: &str) -> Option<String> {
    let filename = extract_filename(url);
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 5 {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether the URL path ends in `.pdf` (query and fragment ignored).
#[must_use]
pub fn is_pdf_url(url: &str) -> bool {
    extension(url).as_deref() == Some("pdf")
}

/// Key used to deduplicate images: lowercase filename without query.
///
/// Falls back to the normalized URL for extensionless CDN paths.
#[must_use]
pub fn image_dedup_key(url: &str) -> String {
    let filename = extract_filename(url);
    if filename.is_empty() {
        normalize_url(url).to_ascii_lowercase()
    } else {
        filename.to_ascii_lowercase()
    }
}

/// Scheme plus host, e.g. `https://shop.example.com`.
#[must_use]
pub fn origin(url_str: &str) -> Option<String> {
    let url = parse_url(url_str)?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_absolute_url() {
        assert!(is_absolute_url("https://example.com/path").0);
        assert!(!is_absolute_url("/relative/path").0);
        assert!(!is_absolute_url("example.com").0);
        assert!(!is_absolute_url("ftp://example.com/file").0);
    }

    #[test]
    fn test_resolve_relative_and_protocol_relative() {
        let base = Url::parse("https://shop.example.com/products/chair").ok();
        assert_eq!(
            resolve("/files/manual.pdf", base.as_ref()).as_deref(),
            Some("https://shop.example.com/files/manual.pdf")
        );
        assert_eq!(
            resolve("//cdn.example.com/a.jpg", None).as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
        assert_eq!(resolve("data:image/png;base64,xx", base.as_ref()), None);
        assert_eq!(resolve("#tab-specs", base.as_ref()), None);
        assert_eq!(resolve("img/a.jpg", None), None);
    }

    #[test]
    fn test_extension_and_pdf_detection() {
        assert_eq!(extension("https://x.com/a/B.JPG?w=800").as_deref(), Some("jpg"));
        assert_eq!(extension("https://x.com/a/b"), None);
        assert!(is_pdf_url("https://x.com/docs/Manual.PDF?download=1"));
        assert!(!is_pdf_url("https://x.com/docs/manual.pdf.html"));
    }

    #[test]
    fn test_image_dedup_key_ignores_host_and_query() {
        assert_eq!(
            image_dedup_key("https://a.com/x/Chair.jpg?v=1"),
            image_dedup_key("https://b.com/y/chair.jpg?v=2")
        );
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("https://example.com/page/#section"),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_origin() {
        assert_eq!(origin("https://shop.example.com/p/1").as_deref(), Some("https://shop.example.com"));
        assert_eq!(origin("http://localhost:8080/x").as_deref(), Some("http://localhost:8080"));
    }
}
