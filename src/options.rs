//! Configuration options for product ingestion.
//!
//! `Options` controls the per-request behavior recognized by the ingestion
//! entrypoint. `FetchConfig` and `PdfConfig` configure the long-lived
//! fetch and enrichment components.

use std::time::Duration;

use crate::fetch::RetryPolicy;

/// Rendering mode requested from the render service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Fast render: DOM snapshot as soon as the page settles.
    #[default]
    Fast,
    /// Full render: waits for network idle and lazy content.
    Full,
}

impl RenderMode {
    /// Query-string value for the render service.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Full => "full",
        }
    }

    /// Parse a query/CLI value; anything other than `full` is `fast`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("full") {
            Self::Full
        } else {
            Self::Fast
        }
    }
}

/// Per-request ingestion options.
///
/// All fields are public for easy configuration. Use `Default::default()`
/// for standard settings.
///
/// # Example
///
/// ```rust
/// use rs_product_extract::Options;
///
/// let options = Options {
///     harvest: true,
///     min_image_px: 300,
///     ..Options::default()
/// };
/// assert!(options.harvest);
/// ```
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct Options {
    /// Source URL of the page, used to resolve relative links.
    ///
    /// Default: `None`
    pub url: Option<String>,

    /// CSS selector the render service should wait for.
    ///
    /// Default: `None`
    pub selector: Option<String>,

    /// Extra settle time for the render service, in milliseconds.
    ///
    /// Default: `None`
    pub wait: Option<u64>,

    /// Render-side timeout in milliseconds.
    ///
    /// Default: `None`
    pub timeout: Option<u64>,

    /// Render mode.
    ///
    /// Default: `RenderMode::Fast`
    pub mode: RenderMode,

    /// Minimum inferred pixel dimension for product images.
    ///
    /// Default: `200`
    pub min_image_px: u32,

    /// Drop PNG images (often diagrams and badges on some storefronts).
    ///
    /// Default: `false`
    pub exclude_png: bool,

    /// Relax image host/path filters and accept extensionless image URLs.
    ///
    /// Default: `false`
    pub aggressive: bool,

    /// Run the tab/accordion harvester pass.
    ///
    /// Default: `false`
    pub harvest: bool,

    /// Run an additional post-hoc cleanup pass over the finished record.
    ///
    /// Default: `false`
    pub sanitize: bool,

    /// Also emit markdown renderings of description, specs and features.
    ///
    /// Default: `false`
    pub markdown: bool,

    /// Include stage timings and warnings in the output.
    ///
    /// Default: `false`
    pub debug: bool,

    /// Fetch and mine linked PDF manuals.
    ///
    /// Default: `false`
    pub enrich_manuals: bool,

    /// Overall request budget. Advisory: exceeding it logs a warning and is
    /// recorded in diagnostics, in-flight work is not cancelled.
    ///
    /// Default: 90 seconds
    pub request_timeout: Duration,

    /// Maximum number of images in the final record.
    ///
    /// Default: `12`
    pub max_images: usize,

    /// Maximum number of manual URLs in the final record.
    ///
    /// Default: `8`
    pub max_manuals: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            url: None,
            selector: None,
            wait: None,
            timeout: None,
            mode: RenderMode::Fast,
            min_image_px: 200,
            exclude_png: false,
            aggressive: false,
            harvest: false,
            sanitize: false,
            markdown: false,
            debug: false,
            enrich_manuals: false,
            request_timeout: Duration::from_secs(90),
            max_images: crate::noise::IMAGES_FINAL_CAP,
            max_manuals: crate::noise::MANUALS_CAP,
        }
    }
}

/// Configuration of the fetch layer.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base URL of the render service (`RENDER_API_URL`). Required for rendered fetches.
    pub render_api_url: Option<String>,

    /// Optional bearer token for the render service.
    pub render_api_token: Option<String>,

    /// Per-attempt timeout, enforced by cancellation.
    pub attempt_timeout: Duration,

    /// Hard cap on response size.
    pub max_bytes: usize,

    /// Cache entry time-to-live.
    pub cache_ttl: Duration,

    /// Maximum number of cached render responses.
    pub cache_capacity: usize,

    /// Retry policy for render requests.
    pub retry: RetryPolicy,

    /// Fall back to a direct, unrendered fetch on persistent 502/503/504.
    pub direct_fallback: bool,

    /// Resolve hostnames and reject private/loopback/link-local addresses.
    /// IP literals and bare hostnames are always checked.
    pub resolve_hosts: bool,

    /// User agent for direct fetches.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            render_api_url: None,
            render_api_token: None,
            attempt_timeout: Duration::from_secs(20),
            max_bytes: 3 * 1024 * 1024,
            cache_ttl: Duration::from_secs(180),
            cache_capacity: 100,
            retry: RetryPolicy::default(),
            direct_fallback: true,
            resolve_hosts: true,
            user_agent: crate::fetch::DESKTOP_USER_AGENT.to_string(),
        }
    }
}

/// Configuration of the PDF enrichment pass.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    /// Per-request timeout for manual downloads.
    pub fetch_timeout: Duration,

    /// Byte cap per manual.
    pub max_bytes: usize,

    /// Number of manuals processed concurrently.
    pub workers: usize,

    /// Maximum number of features contributed across manuals and page.
    pub max_features: usize,

    /// Pages rasterized per manual when the OCR fallback runs.
    pub ocr_max_pages: usize,

    /// Resolve manual hostnames and skip those with internal addresses.
    /// Default: `true`
    pub resolve_hosts: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            max_bytes: 25 * 1024 * 1024,
            workers: 2,
            max_features: crate::noise::FEATURES_MERGED_CAP,
            ocr_max_pages: 10,
            resolve_hosts: true,
        }
    }
}
