//! Compiled regex patterns and CSS selectors for product extraction.
//!
//! All patterns are compiled once at startup using `LazyLock` for efficiency.
//! Patterns are organized by their purpose in the extraction pipeline.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

// =============================================================================
// Container Identification Patterns (matched against lowercased id + class)
// =============================================================================

/// Containers that hold the product description.
pub static DESCRIPTION_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(description|product[-_]?(details?|info|overview|copy|content)|overview|about[-_]?(this|the)?[-_]?product|pdp[-_]?(desc|details))")
        .expect("DESCRIPTION_CLASS regex")
});

/// Containers that hold specification tables or lists.
pub static SPEC_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(spec|technical|tech[-_]?data|attribute|dimension|additional[-_]?information|product[-_]?(data|facts|details)|data[-_]?table|shop_attributes)")
        .expect("SPEC_CLASS regex")
});

/// Containers explicitly labelled as features.
pub static FEATURE_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(feature|highlight|benefit|selling[-_]?point|key[-_]?points|bullet)")
        .expect("FEATURE_CLASS regex")
});

/// Image gallery containers.
pub static GALLERY_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(gallery|product[-_]?(image|img|photo|media|slider|carousel|thumbnails?-main)|product__media|slider|carousel|swiper|fotorama|zoom|slick|lightbox|main[-_]?image|hero[-_]?image)")
        .expect("GALLERY_CLASS regex")
});

/// Containers likely to list downloadable documents.
pub static DOCUMENT_CONTAINER_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(product|tab|resource|download|document|manual|literature|support|attachment)")
        .expect("DOCUMENT_CONTAINER_CLASS regex")
});

/// Page chrome that never contains product content.
pub static CHROME_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[\s_-])(nav|navbar|navigation|site-header|footer|breadcrumbs?|cookie|newsletter|modal|cart|minicart|related|upsell|cross-sell|recently[-_]?viewed|reviews?)([\s_-]|$)")
        .expect("CHROME_CLASS regex")
});

// =============================================================================
// Text Patterns
// =============================================================================

/// Matches multiple whitespace characters for normalization.
pub static WHITESPACE_NORMALIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_NORMALIZE regex"));

/// `Key: Value` shaped line. Key starts with a letter and is at most 48 chars.
pub static KEY_VALUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z0-9 /()&.,'#%+-]{0,47}?)\s*[:：]\s*(\S.{0,199}?)\s*$")
        .expect("KEY_VALUE_LINE regex")
});

/// Bare page-number lines such as `12`, `Page 3`, `3 of 10`, `- 4 -`.
pub static PAGE_NUMBER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*[-–]?\s*(page\s*)?\d{1,4}(\s*(of|/)\s*\d{1,4})?\s*[-–]?\s*$")
        .expect("PAGE_NUMBER_LINE regex")
});

/// Part-number-shaped token lines (`AB-1234-X`, `SKU 99812`).
pub static PART_NUMBER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*((sku|part|item|model|mpn|ref)\s*(#|no\.?|number)?\s*:?\s*)?[A-Z0-9]*\d[A-Z0-9]*([-_./][A-Z0-9]+)*\s*$")
        .expect("PART_NUMBER_LINE regex")
});

/// Separators between a product title and the site name in `<title>`.
pub static TITLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[\|–—·]\s+|\s+-\s+").expect("TITLE_SEPARATOR regex"));

/// Leading bullet glyphs and list markers.
pub static BULLET_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([•·▪▸►◦‣⁃✓✔☑*]|[-–—]\s|\d{1,2}[.)]\s)\s*").expect("BULLET_PREFIX regex")
});

// =============================================================================
// URL Patterns
// =============================================================================

/// Absolute image URLs embedded in free text or scripts.
pub static IMAGE_URL_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:https?:)?//[^\s"'<>()\\]+?\.(?:jpe?g|png|webp|avif)(?:\?[^\s"'<>()\\]*)?"#)
        .expect("IMAGE_URL_IN_TEXT regex")
});

/// PDF URLs embedded in free text or scripts.
pub static PDF_URL_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:https?:)?//[^\s"'<>()\\]+?\.pdf(?:\?[^\s"'<>()\\]*)?"#)
        .expect("PDF_URL_IN_TEXT regex")
});

/// `href`/`src`/`data` attributes pointing at a PDF in raw HTML.
pub static PDF_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:href|src|data|content)\s*=\s*["']([^"']+?\.pdf(?:[?#][^"']*)?)["']"#)
        .expect("PDF_HREF regex")
});

/// `url(...)` inside inline styles.
pub static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("CSS_URL regex")
});

/// `WxH` size hints in image filenames (`_800x800`, `-1200x900`, `_1024x`).
pub static FILENAME_SIZE_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[_-](\d{2,4})x(\d{2,4})?(?:[_.@-]|$)").expect("FILENAME_SIZE_HINT regex")
});

/// Width/size hints in query strings (`?w=800`, `&width=1200`, `?size=600`).
pub static QUERY_SIZE_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[?&](?:w|width|wid|size|sw|imwidth|resize)=(\d{2,4})").expect("QUERY_SIZE_HINT regex")
});

// =============================================================================
// CSS Selectors
// =============================================================================

/// Main content regions, most specific first.
pub const MAIN_SELECTOR: &str =
    "main, [role='main'], #main, .main, #content, .content, .product, #product, article";

/// Product title candidates.
pub const TITLE_SELECTOR: &str =
    "h1[itemprop='name'], h1.product-title, h1.product_title, h1.product__title, .product-title h1, h1";
