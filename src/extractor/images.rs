//! Image discovery and relevance scoring.
//!
//! Every image URL on the page becomes an [`ImageCandidate`] carrying
//! independent signals: where it was found, declared size, path shape,
//! filename or query size hints, and token overlap with the product name and
//! code. Within one signal kind the strongest value counts; different kinds
//! add up, so a URL found again never loses weight. Candidates are filtered
//! (extension allowlist, minimum inferred size, path and host blocklists),
//! merged by base filename and ranked by score.

#![allow(clippy::expect_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use dom_query::{Document, Selection};
use regex::Regex;

use super::{in_chrome, main_region, ExtractContext};
use crate::dom;
use crate::json_walk::{self, UrlKind};
use crate::patterns::{CSS_URL, FILENAME_SIZE_HINT, GALLERY_CLASS, QUERY_SIZE_HINT};
use crate::url_utils;

/// Accepted image extensions.
const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "avif"];

/// Hosts that only serve trackers, avatars, badges or social embeds.
const BLOCKED_HOSTS: &[&str] = &[
    "doubleclick.net", "google-analytics.com", "googletagmanager.com", "facebook.com",
    "facebook.net", "fbcdn.net", "gravatar.com", "trustpilot.com", "paypalobjects.com",
    "bat.bing.com", "twimg.com", "pinimg.com", "ytimg.com", "yotpo.com", "klaviyo.com",
];

/// Attributes holding the full-size image, strongest first.
const LARGE_IMAGE_ATTRS: &[&str] = &["data-zoom-image", "data-large_image", "data-zoom", "data-full", "data-large"];

/// Attributes holding a lazily loaded image.
const LAZY_IMAGE_ATTRS: &[&str] = &["data-src", "data-original", "data-lazy-src", "data-image"];

/// Penalty subtracted from the weight of thumbnail-shaped images.
const THUMBNAIL_PENALTY: i64 = 15;

/// Non-product image paths.
static NOISE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(logo|icon|sprite|favicon|social|facebook|twitter|instagram|pinterest|badge|payment|placeholder|spinner|loader|loading|flag|avatar|swatch|/thumbnails?/)")
        .expect("NOISE_PATH regex")
});

/// Thumbnail-shaped filenames (`_thumb`, `-small`, `_compact`, `_100x`).
static THUMBNAIL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[_-](thumb|thumbnail|small|compact|pico|icon|mini|tn)([_.@-]|$)|[_-]\d{2}x(\d{2})?[_.@-]")
        .expect("THUMBNAIL_NAME regex")
});

/// Path segments typical of product media.
static PRODUCT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(products?|files|media/catalog|uploads|product[-_]images?|catalog)/")
        .expect("PRODUCT_PATH regex")
});

/// Where a URL was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Inside a gallery, slider or zoom container.
    Gallery,
    /// Listed by structured data.
    Structured,
    /// `og:image` / `twitter:image`.
    OpenGraph,
    /// `<img>` inside the main content region.
    Main,
    /// String inside an inline script.
    Script,
    /// Any other `<img>`, `<source>` or background image.
    Generic,
}

impl ImageOrigin {
    fn weight(self) -> u32 {
        match self {
            Self::Gallery => 40,
            Self::Structured => 35,
            Self::OpenGraph => 30,
            Self::Main => 15,
            Self::Script => 8,
            Self::Generic => 5,
        }
    }
}

/// Independent signal kinds. Within a kind the maximum counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalKind {
    /// Container or source type.
    Origin,
    /// `width`/`height` attributes or `srcset` descriptors.
    DeclaredSize,
    /// Product-media path segment.
    PathPattern,
    /// Filename or query-string size hint.
    SizeHint,
    /// Product code appears in the URL.
    CodeMatch,
    /// Product name tokens appear in the URL.
    NameMatch,
    /// Alt text mentions the product.
    AltText,
}

/// A scored image URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    /// Absolute image URL.
    pub url: String,
    signals: BTreeMap<SignalKind, u32>,
    /// Thumbnail-shaped filename or thumbnail strip container.
    pub thumbnail: bool,
}

impl ImageCandidate {
    /// Candidate with no signals yet.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            signals: BTreeMap::new(),
            thumbnail: false,
        }
    }

    /// Record a signal, keeping the strongest value per kind.
    pub fn add_signal(&mut self, kind: SignalKind, value: u32) {
        if value == 0 {
            return;
        }
        let slot = self.signals.entry(kind).or_insert(0);
        *slot = (*slot).max(value);
    }

    /// Strength of one signal kind.
    #[must_use]
    pub fn signal(&self, kind: SignalKind) -> u32 {
        self.signals.get(&kind).copied().unwrap_or(0)
    }

    /// Sum of the strongest value of every signal kind.
    #[must_use]
    pub fn weight(&self) -> u32 {
        self.signals.values().sum()
    }

    /// Ranking score: weight minus the thumbnail penalty.
    #[must_use]
    pub fn score(&self) -> i64 {
        i64::from(self.weight()) - if self.thumbnail { THUMBNAIL_PENALTY } else { 0 }
    }

    /// Fold another sighting of the same image into this one.
    ///
    /// Signals merge by maximum; the candidate stays a thumbnail only when
    /// every sighting was one.
    pub fn absorb(&mut self, other: ImageCandidate) {
        for (kind, value) in other.signals {
            self.add_signal(kind, value);
        }
        self.thumbnail = self.thumbnail && other.thumbnail;
    }
}

/// Deduplicate by base filename (merging signals), sort by descending score
/// and keep the top `cap`. Ties keep discovery order.
#[must_use]
pub fn rank_images(candidates: Vec<ImageCandidate>, cap: usize) -> Vec<ImageCandidate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<ImageCandidate> = Vec::new();

    for candidate in candidates {
        let key = url_utils::image_dedup_key(&candidate.url);
        match index.get(&key) {
            Some(&i) => merged[i].absorb(candidate),
            None => {
                index.insert(key, merged.len());
                merged.push(candidate);
            }
        }
    }

    merged.sort_by(|a, b| b.score().cmp(&a.score()));
    merged.truncate(cap);
    merged
}

/// One sighting of an image element or URL.
struct Sighting {
    url: String,
    origin: ImageOrigin,
    declared: Option<u32>,
    alt: String,
    in_thumbnail_strip: bool,
}

impl Sighting {
    fn bare(url: String, origin: ImageOrigin) -> Self {
        Self {
            url,
            origin,
            declared: None,
            alt: String::new(),
            in_thumbnail_strip: false,
        }
    }
}

/// Ranked image URLs of the whole page.
#[must_use]
pub fn extract_images(doc: &Document, ctx: &ExtractContext<'_>, structured: &[String]) -> Vec<String> {
    let mut sightings = Vec::new();

    for url in structured {
        sightings.push(Sighting::bare(url.clone(), ImageOrigin::Structured));
    }

    for meta in doc.select("meta[content]").iter() {
        let key = format!("{} {}", dom::attr(&meta, "property"), dom::attr(&meta, "name")).to_lowercase();
        if key.contains("og:image") || key.contains("twitter:image") {
            sightings.push(Sighting::bare(dom::attr(&meta, "content"), ImageOrigin::OpenGraph));
        }
    }

    let containers = doc.select("div, section, ul, figure");
    for gallery in containers.iter() {
        if !GALLERY_CLASS.is_match(&dom::id_class(&gallery)) || in_chrome(&gallery) {
            continue;
        }
        sightings.extend(element_sightings(&gallery, ImageOrigin::Gallery));
        for link in gallery.select("a[href]").iter() {
            let href = dom::attr(&link, "href");
            if has_image_extension(&href) {
                sightings.push(Sighting::bare(href, ImageOrigin::Gallery));
            }
        }
    }

    let main = main_region(doc);
    sightings.extend(element_sightings(&main, ImageOrigin::Main));
    sightings.extend(element_sightings(&doc.select("body"), ImageOrigin::Generic));
    sightings.extend(background_sightings(&doc.select("body")));

    for script in doc.select("script").iter() {
        let kind = dom::attr(&script, "type").to_lowercase();
        if kind.contains("ld+json") || !dom::attr(&script, "src").is_empty() {
            continue;
        }
        for url in json_walk::collect_urls(&script.text(), UrlKind::Image) {
            sightings.push(Sighting::bare(url, ImageOrigin::Script));
        }
    }

    let candidates = score_sightings(sightings, ctx);
    rank_images(candidates, ctx.options.max_images)
        .into_iter()
        .map(|c| c.url)
        .collect()
}

/// Ranked image URLs inside one container.
#[must_use]
pub fn images_in(root: &Selection, ctx: &ExtractContext<'_>) -> Vec<String> {
    let mut sightings = element_sightings(root, ImageOrigin::Main);
    sightings.extend(background_sightings(root));
    rank_images(score_sightings(sightings, ctx), ctx.options.max_images)
        .into_iter()
        .map(|c| c.url)
        .collect()
}

/// `<img>` and `<source>` sightings under `root`, skipping page chrome.
fn element_sightings(root: &Selection, origin: ImageOrigin) -> Vec<Sighting> {
    let mut out = Vec::new();
    for el in root.select("img, source").iter() {
        if in_chrome(&el) {
            continue;
        }
        let Some((url, srcset_width)) = element_url(&el) else {
            continue;
        };
        let declared = declared_size(&el).or(srcset_width);
        let strip = dom::ancestor_id_classes(&el, 4).iter().any(|ic| ic.contains("thumb"));
        out.push(Sighting {
            url,
            origin,
            declared,
            alt: dom::attr(&el, "alt"),
            in_thumbnail_strip: strip,
        });
    }
    out
}

/// Inline `background-image: url(...)` sightings.
fn background_sightings(root: &Selection) -> Vec<Sighting> {
    let mut out = Vec::new();
    for el in root.select("[style]").iter() {
        if in_chrome(&el) {
            continue;
        }
        let style = dom::attr(&el, "style");
        if !style.to_ascii_lowercase().contains("background") {
            continue;
        }
        for caps in CSS_URL.captures_iter(&style) {
            if let Some(url) = caps.get(1) {
                out.push(Sighting::bare(url.as_str().to_string(), ImageOrigin::Generic));
            }
        }
    }
    out
}

/// Best URL of an image element: full-size attributes, then the widest
/// `srcset` entry, then lazy attributes, then `src`.
fn element_url(el: &Selection) -> Option<(String, Option<u32>)> {
    for name in LARGE_IMAGE_ATTRS {
        let value = dom::attr(el, name);
        if is_usable_src(&value) {
            return Some((value.trim().to_string(), None));
        }
    }
    for name in ["srcset", "data-srcset"] {
        if let Some((url, width)) = widest_srcset(&dom::attr(el, name)) {
            return Some((url, width));
        }
    }
    for name in LAZY_IMAGE_ATTRS.iter().chain(&["src"]) {
        let value = dom::attr(el, name);
        if is_usable_src(&value) {
            return Some((value.trim().to_string(), None));
        }
    }
    None
}

fn is_usable_src(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.starts_with("data:") && !value.contains("{width}")
}

/// Widest entry of a `srcset` (`url 800w, url 1200w` or `url 2x`).
fn widest_srcset(srcset: &str) -> Option<(String, Option<u32>)> {
    let mut best: Option<(String, Option<u32>, u32)> = None;
    for entry in srcset.split(',') {
        let mut parts = entry.split_whitespace();
        let Some(url) = parts.next() else {
            continue;
        };
        if !is_usable_src(url) {
            continue;
        }
        let descriptor = parts.next().unwrap_or("1x");
        let (width, rank) = if let Some(w) = descriptor.strip_suffix('w') {
            let w = w.parse::<u32>().unwrap_or(0);
            (Some(w), w)
        } else {
            let density = descriptor.trim_end_matches('x').parse::<f32>().unwrap_or(1.0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let rank = (density * 100.0) as u32;
            (None, rank)
        };
        if best.as_ref().is_none_or(|(_, _, r)| rank > *r) {
            best = Some((url.to_string(), width, rank));
        }
    }
    best.map(|(url, width, _)| (url, width))
}

/// Larger of the declared `width`/`height` attributes.
fn declared_size(el: &Selection) -> Option<u32> {
    ["width", "height", "data-width", "data-height"]
        .iter()
        .filter_map(|name| dom::attr(el, name).trim().trim_end_matches("px").parse::<u32>().ok())
        .max()
}

fn has_image_extension(url: &str) -> bool {
    url_utils::extension(url).is_some_and(|ext| EXTENSIONS.contains(&ext.as_str()))
}

/// Smallest pixel dimension implied by the filename or query string.
#[must_use]
pub fn inferred_size(url: &str) -> Option<u32> {
    let filename = url_utils::extract_filename(url);
    if let Some(caps) = FILENAME_SIZE_HINT.captures(&filename) {
        let width = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let height = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
        return match (width, height) {
            (Some(w), Some(h)) => Some(w.min(h)),
            (w, h) => w.or(h),
        };
    }
    QUERY_SIZE_HINT
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Whether an absolute URL passes the extension, size, path and host filters.
#[must_use]
pub fn accept_image(url: &str, ctx: &ExtractContext<'_>) -> bool {
    let options = ctx.options;
    match url_utils::extension(url) {
        Some(ext) if EXTENSIONS.contains(&ext.as_str()) => {
            if options.exclude_png && ext == "png" {
                return false;
            }
        }
        Some(_) => return false,
        None if !options.aggressive => return false,
        None => {}
    }

    if inferred_size(url).is_some_and(|size| size < options.min_image_px) {
        return false;
    }

    if options.aggressive {
        return true;
    }

    let Some(parsed) = url_utils::parse_url(url) else {
        return false;
    };
    if NOISE_PATH.is_match(parsed.path()) {
        return false;
    }
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    !BLOCKED_HOSTS
        .iter()
        .any(|blocked| host == *blocked || host.ends_with(&format!(".{blocked}")))
}

fn score_sightings(sightings: Vec<Sighting>, ctx: &ExtractContext<'_>) -> Vec<ImageCandidate> {
    let base = ctx.base.as_ref();
    let name_tokens = ctx.name_tokens();
    let sku = ctx.sku_token();
    let min_px = ctx.options.min_image_px;

    let mut out = Vec::new();
    for sighting in sightings {
        let Some(url) = url_utils::resolve(&sighting.url, base) else {
            continue;
        };
        if !accept_image(&url, ctx) {
            continue;
        }

        let mut candidate = ImageCandidate::new(url.clone());
        let lower = url.to_lowercase();

        candidate.add_signal(SignalKind::Origin, sighting.origin.weight());
        candidate.add_signal(SignalKind::DeclaredSize, size_points(sighting.declared, min_px, [800, 400], [20, 12, 6]));
        candidate.add_signal(SignalKind::SizeHint, size_points(inferred_size(&url), min_px, [1000, 600], [15, 10, 5]));
        if PRODUCT_PATH.is_match(&lower) {
            candidate.add_signal(SignalKind::PathPattern, 10);
        }
        if sku.as_deref().is_some_and(|code| lower.contains(code)) {
            candidate.add_signal(SignalKind::CodeMatch, 25);
        }
        let name_hits = name_tokens.iter().filter(|t| lower.contains(t.as_str())).count();
        candidate.add_signal(SignalKind::NameMatch, u32::try_from(name_hits * 6).unwrap_or(24).min(24));
        let alt = sighting.alt.to_lowercase();
        if !alt.is_empty() && name_tokens.iter().any(|t| alt.contains(t.as_str())) {
            candidate.add_signal(SignalKind::AltText, 8);
        }

        let filename = url_utils::extract_filename(&url);
        candidate.thumbnail = sighting.in_thumbnail_strip || THUMBNAIL_NAME.is_match(&filename);
        out.push(candidate);
    }
    out
}

fn size_points(size: Option<u32>, min_px: u32, tiers: [u32; 2], points: [u32; 3]) -> u32 {
    match size {
        Some(s) if s >= tiers[0] => points[0],
        Some(s) if s >= tiers[1] => points[1],
        Some(s) if s >= min_px => points[2],
        _ => 0,
    }
}
