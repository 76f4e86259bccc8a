//! # rs-product-extract
//!
//! Product page ingestion and normalization.
//!
//! Turns a product detail page into one normalized record: name, brand,
//! product code, description, canonical specifications, feature bullets,
//! ranked images and manual links. Structured data (JSON-LD, microdata, RDFa)
//! is read first, DOM heuristics fill the gaps, tabbed content panes are
//! harvested, and linked PDF manuals can be mined for extra specs.
//!
//! ## Quick Start
//!
//! ```rust
//! use rs_product_extract::{extract_product, Options};
//!
//! let html = r#"<html><head><title>Travel Walker</title></head>
//! <body><main><h1>Travel Walker</h1>
//! <div class="product-description"><p>A light folding walker with padded handles.</p></div>
//! <table><tr><th>Weight Capacity</th><td>300 lbs</td></tr></table>
//! </main></body></html>"#;
//!
//! let output = extract_product(html, &Options::default())?;
//! assert_eq!(output.record.name, "Travel Walker");
//! assert_eq!(output.record.specs.get("weight_capacity").map(String::as_str), Some("300 lb"));
//! # Ok::<(), rs_product_extract::Error>(())
//! ```
//!
//! ## Fetching
//!
//! [`Ingestor`] fetches pages through a headless render service with retries,
//! a short-lived HTML cache and a direct-fetch fallback, then runs the same
//! extraction plus optional manual enrichment.
//!
//! ## Features
//!
//! - **Structured data**: JSON-LD, microdata and RDFa product nodes
//! - **DOM heuristics**: description, spec, feature, image and manual discovery
//! - **Tab harvesting**: ARIA tabs, accordions, platform widgets and hidden panes
//! - **Noise filtering**: commerce boilerplate, canonical spec keys, unit normalization
//! - **Manual enrichment**: PDF download fallbacks, text layer, OCR fallback
//! - **Reconciliation**: three-way field merge with a conflict log

mod error;
mod options;
mod patterns;
mod result;

/// DOM helpers over `dom_query`.
pub mod dom;

/// URL resolution, normalization and dedup keys.
pub mod url_utils;

/// Character encoding detection and transcoding.
pub mod encoding;

/// Markdown renderings of descriptions, features and specs.
pub mod markdown;

/// Generic JSON traversal and URL discovery in script payloads.
pub mod json_walk;

/// Noise filtering, spec canonicalization and record sanitation.
pub mod noise;

/// Structured-data sources (JSON-LD, microdata, RDFa).
pub mod structured;

/// DOM heuristic extraction.
pub mod extractor;

/// Tabbed content discovery and harvest.
pub mod tabs;

/// Render-service fetching, caching, retries and SSRF guards.
pub mod fetch;

/// PDF manual download, text extraction and OCR.
pub mod pdf;

/// Bounded-concurrency batch execution.
pub mod batch;

/// Three-way field reconciliation.
pub mod conflict;

/// Content-rule validation.
pub mod qa;

/// Stage orchestration.
pub mod pipeline;

// Public API - re-exports
pub use error::{Error, ErrorBody, Result};
pub use options::{FetchConfig, Options, PdfConfig, RenderMode};
pub use pipeline::{Extractor, IngestOutput, Ingestor};
pub use result::{
    Candidate, Diagnostics, ImageRef, ManualDocument, PdfEnrichment, ProductRecord, Provenance, PublishedRecord,
    StageTiming,
};

/// Extracts a product record from an HTML document without network access.
///
/// `options.url` is used as the record source and as the base for relative
/// links. Manual enrichment is not performed; use [`Ingestor`] for that.
///
/// # Example
///
/// ```rust
/// use rs_product_extract::{extract_product, Options};
///
/// let html = "<html><body><h1>Rollator</h1></body></html>";
/// let options = Options {
///     url: Some("https://shop.example.com/p/rollator".into()),
///     ..Options::default()
/// };
/// let output = extract_product(html, &options)?;
/// assert_eq!(output.record.source, "https://shop.example.com/p/rollator");
/// # Ok::<(), rs_product_extract::Error>(())
/// ```
#[allow(clippy::missing_errors_doc)]
pub fn extract_product(html: &str, options: &Options) -> Result<IngestOutput> {
    Extractor::default().extract(html, options)
}

/// Extracts a product record from HTML bytes with automatic encoding detection.
///
/// # Example
///
/// ```rust
/// use rs_product_extract::{extract_product_bytes, Options};
///
/// let html = b"<html><head><meta charset=\"ISO-8859-1\"></head><body><h1>Caf\xE9 Chair</h1></body></html>";
/// let output = extract_product_bytes(html, &Options::default())?;
/// assert_eq!(output.record.name, "Café Chair");
/// # Ok::<(), rs_product_extract::Error>(())
/// ```
#[allow(clippy::missing_errors_doc)]
pub fn extract_product_bytes(html: &[u8], options: &Options) -> Result<IngestOutput> {
    let html = encoding::decode_body(html, None);
    extract_product(&html, options)
}
