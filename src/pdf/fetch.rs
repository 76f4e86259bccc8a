//! Manual retrieval: URL variants, header fallbacks, content classification
//! and landing-page link following.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use super::ManualError;
use crate::fetch::{guard, Headers, HttpClient, HttpResponse, DESKTOP_USER_AGENT};
use crate::options::PdfConfig;
use crate::patterns::{PDF_HREF, PDF_URL_IN_TEXT};
use crate::url_utils;

/// Path segments CDNs and CMSs put in front of the real file.
const PROXY_SEGMENTS: &[&str] = &["download", "view", "asset", "file", "document"];

/// Alternate desktop identity for the last retry.
const ALTERNATE_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0";

/// Landing-page links tried before giving up.
const MAX_LANDING_LINKS: usize = 6;

/// How far into the body the `%PDF-` signature may appear.
const SNIFF_BYTES: usize = 1024;

/// What a response turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// A PDF document.
    Pdf,
    /// An HTML page, possibly linking to the PDF.
    Html,
    /// Anything else.
    Other,
}

/// A confirmed PDF document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfBytes {
    /// URL that served the document.
    pub url: String,
    /// Raw document bytes.
    pub bytes: Vec<u8>,
}

/// Equivalent URLs for a manual: the original, the bare-domain variant, and
/// the original with each proxy segment removed individually and all at once.
#[must_use]
pub fn candidate_urls(raw: &str) -> Vec<String> {
    let mut out = vec![raw.to_string()];
    let Ok(url) = Url::parse(raw) else {
        return out;
    };

    if let Some(bare) = url.host_str().and_then(|h| h.strip_prefix("www.")) {
        let mut variant = url.clone();
        if variant.set_host(Some(bare)).is_ok() {
            push_new(&mut out, variant.to_string());
        }
    }

    let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
    let is_proxy = |s: &&str| PROXY_SEGMENTS.contains(&s.to_ascii_lowercase().as_str());
    let with_segments = |kept: &[&str]| {
        let mut variant = url.clone();
        variant.set_path(&format!("/{}", kept.join("/")));
        variant.to_string()
    };

    for (index, segment) in segments.iter().enumerate() {
        if is_proxy(segment) {
            let mut kept = segments.clone();
            kept.remove(index);
            push_new(&mut out, with_segments(&kept));
        }
    }
    if segments.iter().filter(|s| is_proxy(*s)).count() > 1 {
        let kept: Vec<&str> = segments.iter().copied().filter(|s| !is_proxy(s)).collect();
        push_new(&mut out, with_segments(&kept));
    }
    out
}

fn push_new(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Browser-like request headers.
#[must_use]
pub fn browser_headers() -> Headers {
    vec![
        ("User-Agent".to_string(), DESKTOP_USER_AGENT.to_string()),
        (
            "Accept".to_string(),
            "application/pdf,text/html;q=0.9,application/xhtml+xml;q=0.9,*/*;q=0.8".to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
    ]
}

fn referer_headers(url: &str) -> Headers {
    let mut headers = browser_headers();
    let referer = url_utils::origin(url).map_or_else(|| url.to_string(), |o| format!("{o}/"));
    headers.push(("Referer".to_string(), referer));
    headers
}

fn alternate_headers() -> Headers {
    vec![
        ("User-Agent".to_string(), ALTERNATE_USER_AGENT.to_string()),
        ("Accept".to_string(), "*/*".to_string()),
        ("Accept-Language".to_string(), "en-GB,en;q=0.8".to_string()),
    ]
}

/// Classify a response: `Content-Type` first, then the
/// `Content-Disposition` filename, then the body signature.
#[must_use]
pub fn classify(response: &HttpResponse) -> ContentKind {
    let content_type = response.content_type.as_deref().unwrap_or("").to_ascii_lowercase();
    if content_type.contains("application/pdf") || content_type.contains("application/x-pdf") {
        return ContentKind::Pdf;
    }

    let disposition = response.content_disposition.as_deref().unwrap_or("").to_ascii_lowercase();
    if disposition.contains(".pdf") {
        return ContentKind::Pdf;
    }

    let head = &response.body[..response.body.len().min(SNIFF_BYTES)];
    if head.windows(5).any(|w| w == b"%PDF-") {
        return ContentKind::Pdf;
    }

    if content_type.contains("html") {
        return ContentKind::Html;
    }
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    if head.contains("<html") || head.contains("<!doctype html") {
        ContentKind::Html
    } else {
        ContentKind::Other
    }
}

/// PDF links on an HTML landing page, resolved against the page URL and
/// deduplicated in document order.
#[must_use]
pub fn landing_pdf_links(html: &str, page_url: &str) -> Vec<String> {
    let base = Url::parse(page_url).ok();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let attrs = PDF_HREF.captures_iter(html).filter_map(|c| c.get(1));
    let inline = PDF_URL_IN_TEXT.find_iter(html);
    for raw in attrs.chain(inline).map(|m| m.as_str().replace("&amp;", "&")) {
        if let Some(url) = url_utils::resolve(&raw, base.as_ref()) {
            if seen.insert(url_utils::normalize_url(&url)) {
                links.push(url);
            }
        }
    }
    links
}

/// Downloads manuals through the shared transport.
pub struct ManualFetcher {
    client: Arc<dyn HttpClient>,
    config: PdfConfig,
}

impl ManualFetcher {
    #[must_use]
    pub fn new(client: Arc<dyn HttpClient>, config: PdfConfig) -> Self {
        Self { client, config }
    }

    /// Reject internal targets the same way page fetches do.
    async fn permitted(&self, url: &str) -> Result<(), ManualError> {
        let target = guard::validate_target(url).map_err(|e| ManualError::Blocked(e.to_string()))?;
        if self.config.resolve_hosts {
            guard::check_resolved(&target)
                .await
                .map_err(|e| ManualError::Blocked(e.to_string()))?;
        }
        Ok(())
    }

    async fn get(&self, url: &str, headers: &[(String, String)]) -> Option<HttpResponse> {
        if let Err(err) = self.permitted(url).await {
            warn!(url, error = %err, "manual request skipped");
            return None;
        }
        match self
            .client
            .get(url, headers, self.config.fetch_timeout, self.config.max_bytes)
            .await
        {
            Ok(response) if response.is_success() => Some(response),
            Ok(response) => {
                debug!(url, status = response.status, "manual request rejected");
                None
            }
            Err(err) => {
                debug!(url, error = %err, "manual request failed");
                None
            }
        }
    }

    /// First successful response among the URL variants, then the original
    /// with a `Referer`, then with the alternate identity.
    async fn first_success(&self, url: &str) -> Option<HttpResponse> {
        let headers = browser_headers();
        for candidate in candidate_urls(url) {
            if let Some(response) = self.get(&candidate, &headers).await {
                return Some(response);
            }
        }
        if let Some(response) = self.get(url, &referer_headers(url)).await {
            return Some(response);
        }
        self.get(url, &alternate_headers()).await
    }

    /// Retrieve the PDF behind a manual URL.
    ///
    /// # Errors
    /// `ManualError::Blocked` for internal targets,
    /// `ManualError::Unreachable` when no variant answered successfully,
    /// `ManualError::NotPdf` when the answer is neither a PDF nor a landing
    /// page leading to one.
    pub async fn download(&self, url: &str) -> Result<PdfBytes, ManualError> {
        self.permitted(url).await?;
        let response = self
            .first_success(url)
            .await
            .ok_or_else(|| ManualError::Unreachable(url.to_string()))?;

        match classify(&response) {
            ContentKind::Pdf => Ok(PdfBytes {
                url: response.final_url,
                bytes: response.body,
            }),
            ContentKind::Html => self.follow_landing(url, &response).await,
            ContentKind::Other => Err(ManualError::NotPdf(url.to_string())),
        }
    }

    async fn follow_landing(&self, url: &str, landing: &HttpResponse) -> Result<PdfBytes, ManualError> {
        let page_url = if landing.final_url.is_empty() { url } else { landing.final_url.as_str() };
        let links = landing_pdf_links(&landing.text(), page_url);
        debug!(url, links = links.len(), "manual is a landing page");

        let headers = referer_headers(page_url);
        for link in links.into_iter().take(MAX_LANDING_LINKS) {
            if url_utils::normalize_url(&link) == url_utils::normalize_url(url) {
                continue;
            }
            let Some(response) = self.get(&link, &headers).await else {
                continue;
            };
            if classify(&response) == ContentKind::Pdf {
                return Ok(PdfBytes {
                    url: if response.final_url.is_empty() { link } else { response.final_url },
                    bytes: response.body,
                });
            }
        }
        warn!(url, "landing page has no usable PDF link");
        Err(ManualError::NotPdf(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// Serves one fixed HTML body and records every requested URL.
    struct Recording {
        body: &'static str,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpClient for Recording {
        async fn get(&self, url: &str, _: &[(String, String)], _: Duration, _: usize) -> crate::Result<HttpResponse> {
            self.calls.lock().unwrap().push(url.to_string());
            Ok(HttpResponse {
                status: 200,
                final_url: url.to_string(),
                content_type: Some("text/html".into()),
                body: self.body.as_bytes().to_vec(),
                ..HttpResponse::default()
            })
        }
    }

    fn fetcher(body: &'static str) -> (ManualFetcher, Arc<Recording>) {
        let client = Arc::new(Recording {
            body,
            calls: Mutex::new(Vec::new()),
        });
        let config = PdfConfig {
            resolve_hosts: false,
            ..PdfConfig::default()
        };
        (ManualFetcher::new(client.clone(), config), client)
    }

    #[tokio::test]
    async fn test_internal_manual_url_is_never_requested() {
        let (fetcher, client) = fetcher("<p>secret</p>");
        for url in [
            "http://169.254.169.254/latest/meta-data/manual.pdf",
            "http://localhost/manual.pdf",
            "file:///etc/manual.pdf",
        ] {
            let err = fetcher.download(url).await.unwrap_err();
            assert!(matches!(err, ManualError::Blocked(_)), "{url}: {err}");
        }
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_landing_links_to_internal_hosts_are_skipped() {
        let (fetcher, client) = fetcher(r#"<a href="http://127.0.0.1/files/manual.pdf">Manual</a>"#);
        let err = fetcher
            .download("https://support.example.com/manuals/scooter")
            .await
            .unwrap_err();

        assert!(matches!(err, ManualError::NotPdf(_)));
        assert_eq!(*client.calls.lock().unwrap(), vec!["https://support.example.com/manuals/scooter"]);
    }

    #[test]
    fn test_candidate_urls() {
        let urls = candidate_urls("https://www.example.com/download/file/manuals/ms-4.pdf");
        assert_eq!(
            urls,
            vec![
                "https://www.example.com/download/file/manuals/ms-4.pdf",
                "https://example.com/download/file/manuals/ms-4.pdf",
                "https://www.example.com/file/manuals/ms-4.pdf",
                "https://www.example.com/download/manuals/ms-4.pdf",
                "https://www.example.com/manuals/ms-4.pdf",
            ]
        );
    }

    #[test]
    fn test_candidate_urls_plain() {
        assert_eq!(candidate_urls("https://example.com/m.pdf"), vec!["https://example.com/m.pdf"]);
        assert_eq!(candidate_urls("not a url"), vec!["not a url"]);
    }

    fn response(content_type: Option<&str>, disposition: Option<&str>, body: &[u8]) -> HttpResponse {
        HttpResponse {
            status: 200,
            final_url: "https://example.com/x".into(),
            content_type: content_type.map(str::to_string),
            content_disposition: disposition.map(str::to_string),
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_classify_order() {
        assert_eq!(classify(&response(Some("application/pdf"), None, b"")), ContentKind::Pdf);
        assert_eq!(
            classify(&response(
                Some("application/octet-stream"),
                Some("attachment; filename=\"manual.PDF\""),
                b""
            )),
            ContentKind::Pdf
        );
        assert_eq!(classify(&response(Some("binary/octet-stream"), None, b"%PDF-1.7\n")), ContentKind::Pdf);
        assert_eq!(classify(&response(Some("text/html"), None, b"<p>hi</p>")), ContentKind::Html);
        assert_eq!(classify(&response(None, None, b"<!DOCTYPE html><html>")), ContentKind::Html);
        assert_eq!(classify(&response(None, None, b"PK\x03\x04")), ContentKind::Other);
    }

    #[test]
    fn test_landing_links_resolve_and_dedupe() {
        let html = r#"<a href="/files/manual.pdf">Manual</a>
            <a href="https://example.com/files/manual.pdf">Again</a>
            <script>var u = "https://cdn.example.com/spec.pdf?x=1&amp;y=2";</script>"#;
        let links = landing_pdf_links(html, "https://example.com/support/page");
        assert_eq!(
            links,
            vec!["https://example.com/files/manual.pdf", "https://cdn.example.com/spec.pdf?x=1&y=2"]
        );
    }
}
