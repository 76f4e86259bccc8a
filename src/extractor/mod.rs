//! DOM heuristic extraction.
//!
//! Derives name, description, specs, features, images and manual links
//! directly from markup. Runs alongside structured data and fills whatever it
//! left empty. Every sub-extractor can also be scoped to a single container,
//! which is how harvested tab panes are re-read.
//!
//! ## Module Organization
//!
//! - `meta`: name, brand, product code and meta description
//! - `description`: longest description container, paragraph fallback
//! - `specs`: four-step spec chain (tab pane, densest block, global scan, paragraphs)
//! - `features`: feature-labelled containers with a last-resort paragraph fallback
//! - `images`: multi-signal image scoring and filtering
//! - `manuals`: PDF link discovery and ranking

pub mod description;
pub mod features;
pub mod images;
pub mod manuals;
pub mod meta;
pub mod specs;

use dom_query::{Document, Selection};
use url::Url;

use crate::dom;
use crate::noise::NoiseFilter;
use crate::patterns::CHROME_CLASS;
use crate::result::{Candidate, Provenance};
use crate::tabs::{self, PaneChain, Section};
use crate::Options;

/// Tags whose subtree is page chrome rather than product content.
const CHROME_TAGS: &[&str] = &["nav", "header", "footer", "aside"];

/// How far up the tree chrome classes are looked for.
const CHROME_DEPTH: usize = 12;

/// Everything a sub-extractor needs besides the markup itself.
#[derive(Debug, Clone)]
pub struct ExtractContext<'a> {
    /// Page URL used to resolve relative links.
    pub base: Option<Url>,
    /// Extraction options (image thresholds, aggressiveness).
    pub options: &'a Options,
    /// Noise filter applied to every extracted value.
    pub filter: &'a NoiseFilter,
    /// Product name, used for image and manual token matching.
    pub name_hint: Option<String>,
    /// Product code, used for image and manual token matching.
    pub sku_hint: Option<String>,
    /// Tab and accordion resolvers.
    pub panes: &'a PaneChain,
}

impl<'a> ExtractContext<'a> {
    /// Context without product hints.
    #[must_use]
    pub fn new(base: Option<Url>, options: &'a Options, filter: &'a NoiseFilter) -> Self {
        Self {
            base,
            options,
            filter,
            name_hint: None,
            sku_hint: None,
            panes: tabs::default_chain(),
        }
    }

    /// Resolve panes through `panes` instead of the built-in chain.
    #[must_use]
    pub fn with_panes(mut self, panes: &'a PaneChain) -> Self {
        self.panes = panes;
        self
    }

    /// Set the name and product-code hints.
    #[must_use]
    pub fn with_hints(mut self, name: Option<String>, sku: Option<String>) -> Self {
        self.name_hint = name.filter(|n| !n.trim().is_empty());
        self.sku_hint = sku.filter(|s| !s.trim().is_empty());
        self
    }

    /// Lowercased name tokens of at least three characters.
    #[must_use]
    pub fn name_tokens(&self) -> Vec<String> {
        self.name_hint
            .as_deref()
            .map(|name| {
                name.split(|c: char| !c.is_alphanumeric())
                    .filter(|t| t.chars().count() >= 3)
                    .map(str::to_lowercase)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Lowercased product code, if known.
    #[must_use]
    pub fn sku_token(&self) -> Option<String> {
        self.sku_hint
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| s.len() >= 3)
    }
}

/// Run every DOM sub-extractor over the whole document.
///
/// `structured` is the merged structured-data candidate, if any; its name and
/// code seed the token hints and its images enter image scoring as a signal.
#[must_use]
pub fn extract_dom(doc: &Document, ctx: &ExtractContext<'_>, structured: Option<&Candidate>) -> Candidate {
    let mut candidate = Candidate::new(Provenance::Dom);

    candidate.name = meta::product_name(doc);
    candidate.brand = meta::brand(doc);
    candidate.sku = meta::product_code(doc);

    let hints = ctx.clone().with_hints(
        structured.and_then(|s| s.name.clone()).or_else(|| candidate.name.clone()),
        structured.and_then(|s| s.sku.clone()).or_else(|| candidate.sku.clone()),
    );

    candidate.description = description::extract_description(doc)
        .or_else(|| meta::meta_description(doc));
    candidate.specs = specs::extract_specs(doc, hints.filter, hints.panes);
    candidate.features = features::extract_features(doc, hints.filter, hints.panes);

    let structured_images = structured.map(|s| s.images.as_slice()).unwrap_or_default();
    candidate.images = images::extract_images(doc, &hints, structured_images);
    candidate.manuals = manuals::extract_manuals(doc, &hints);

    hints.filter.clean_candidate(candidate)
}

/// Run the container-scoped extractors relevant to `section` over one pane.
///
/// Specification panes yield specs and manuals, feature panes yield features,
/// overview panes yield a description, download panes yield manuals. Images
/// are read from any pane.
#[must_use]
pub fn extract_pane(root: &Selection, section: Section, ctx: &ExtractContext<'_>) -> Candidate {
    let mut candidate = Candidate::new(Provenance::Tab);

    match section {
        Section::Specifications => {
            candidate.specs = specs::specs_in(root, ctx.filter);
            candidate.manuals = manuals::manuals_in(root, ctx);
        }
        Section::Features => {
            candidate.features = features::features_in(root);
        }
        Section::Overview => {
            candidate.description = description::description_in(root);
        }
        Section::Downloads => {
            candidate.manuals = manuals::manuals_in(root, ctx);
        }
    }
    candidate.images = images::images_in(root, ctx);

    ctx.filter.clean_candidate(candidate)
}

/// Whether the element sits inside navigation, header, footer or other
/// commerce chrome.
#[must_use]
pub fn in_chrome(sel: &Selection) -> bool {
    dom::has_ancestor_tag(sel, CHROME_TAGS)
        || CHROME_CLASS.is_match(&dom::id_class(sel))
        || dom::ancestor_id_classes(sel, CHROME_DEPTH)
            .iter()
            .any(|ic| CHROME_CLASS.is_match(ic))
}

/// The main content region, or `body` when none is marked up.
#[must_use]
pub fn main_region(doc: &Document) -> Selection<'_> {
    let main = doc.select(crate::patterns::MAIN_SELECTOR);
    if main.exists() {
        main.first()
    } else {
        doc.select("body")
    }
}
