//! Tab and accordion harvesting.
//!
//! Product pages hide specifications, features, downloads and long
//! descriptions behind tabs or accordions. This module resolves those named
//! panes across several markup idioms and re-runs the container-scoped
//! extractors against each one.
//!
//! Resolution goes through a [`PaneChain`]: the generic ARIA/Bootstrap
//! resolver first, then the storefront-specific resolvers, each consulted only
//! when everything before it found nothing.

mod generic;
mod platforms;

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use dom_query::{Document, Selection};
use regex::Regex;
use tracing::debug;

pub use generic::GenericPanes;
pub use platforms::{BigCommercePanes, ShopifyPanes, WooCommercePanes};

use crate::dom;
use crate::extractor::{self, ExtractContext};
use crate::result::{push_unique_ci, ProductRecord};

/// Logical pane a label can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Specifications, technical details, dimensions.
    Specifications,
    /// Features, highlights, benefits.
    Features,
    /// Downloads, documents, manuals.
    Downloads,
    /// Overview or long description.
    Overview,
}

impl Section {
    /// Every section, in harvest order.
    pub const ALL: [Section; 4] = [
        Section::Specifications,
        Section::Features,
        Section::Downloads,
        Section::Overview,
    ];

    /// Display name used as a pane title when a pane is found by class name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Specifications => "Specifications",
            Self::Features => "Features",
            Self::Downloads => "Downloads",
            Self::Overview => "Overview",
        }
    }

    fn patterns(self) -> &'static SectionPatterns {
        match self {
            Self::Specifications => &SPECIFICATIONS,
            Self::Features => &FEATURES,
            Self::Downloads => &DOWNLOADS,
            Self::Overview => &OVERVIEW,
        }
    }

    /// Whether a control or heading label names this section.
    #[must_use]
    pub fn matches_label(self, label: &str, mode: MatchMode) -> bool {
        let label = clean_label(label);
        if label.is_empty() || label.chars().count() > 60 {
            return false;
        }
        let patterns = self.patterns();
        match mode {
            MatchMode::Exact => patterns.exact.is_match(&label),
            MatchMode::Contains => patterns.exact.is_match(&label) || patterns.contains.is_match(&label),
        }
    }

    /// Whether an `id`/`class` string hints at this section.
    #[must_use]
    pub fn matches_class(self, id_class: &str) -> bool {
        self.patterns().class_hint.is_match(id_class)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How strictly labels are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The whole label is one of the section's names.
    Exact,
    /// The label mentions the section anywhere.
    Contains,
}

struct SectionPatterns {
    exact: Regex,
    contains: Regex,
    class_hint: Regex,
}

#[allow(clippy::expect_used)]
fn section_patterns(exact: &str, contains: &str, class_hint: &str) -> SectionPatterns {
    SectionPatterns {
        exact: Regex::new(&format!(r"(?i)^(?:{exact})$")).expect("section exact regex"),
        contains: Regex::new(&format!(r"(?i)(?:{contains})")).expect("section contains regex"),
        class_hint: Regex::new(&format!(r"(?i)(?:{class_hint})")).expect("section class regex"),
    }
}

static SPECIFICATIONS: LazyLock<SectionPatterns> = LazyLock::new(|| {
    section_patterns(
        r"specifications?|specs|product specs|tech specs|technical (?:specs|specifications|details|data|information)|product specifications?|dimensions|additional information|specifications (?:&|and) dimensions",
        r"spec|technical|dimension|additional information",
        r"spec|technical|additional[-_]information|attributes",
    )
});

static FEATURES: LazyLock<SectionPatterns> = LazyLock::new(|| {
    section_patterns(
        r"features?|key features|product features|features (?:&|and) benefits|highlights|product highlights|benefits",
        r"feature|highlight|benefit",
        r"feature|highlight|benefit",
    )
});

static DOWNLOADS: LazyLock<SectionPatterns> = LazyLock::new(|| {
    section_patterns(
        r"downloads?|documents?|manuals?|resources|literature|documentation|product documents|manuals (?:&|and) documents|manuals (?:&|and) downloads",
        r"download|document|manual|resource|literature",
        r"download|document|manual|resource|literature|attachment",
    )
});

static OVERVIEW: LazyLock<SectionPatterns> = LazyLock::new(|| {
    section_patterns(
        r"overview|description|product description|product overview|product details|details|about|about this (?:product|item)",
        r"overview|description|about this",
        r"overview|description",
    )
});

#[allow(clippy::expect_used)]
static LABEL_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[(\[]\s*\d+\s*[)\]]\s*$").expect("LABEL_COUNT regex"));

/// Normalize a control label: collapse whitespace, drop a trailing `(3)`
/// count and trailing punctuation.
fn clean_label(label: &str) -> String {
    let label = dom::normalize_ws(label);
    let label = LABEL_COUNT.replace(&label, "");
    label
        .trim()
        .trim_end_matches([':', '+', '-', '–', '›', '»'])
        .trim()
        .to_string()
}

/// Which resolver produced a pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformSource {
    /// ARIA/Bootstrap tabs, panels and accordions.
    Generic,
    /// WooCommerce `woocommerce-tabs`.
    WooCommerce,
    /// BigCommerce `tab-title`/`tab-content`.
    BigCommerce,
    /// Shopify `details` and collapsible rows.
    Shopify,
}

impl fmt::Display for PlatformSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Generic => "generic",
            Self::WooCommerce => "woocommerce",
            Self::BigCommerce => "bigcommerce",
            Self::Shopify => "shopify",
        };
        f.write_str(name)
    }
}

/// A resolved tab or accordion pane. Lives only as long as the document.
#[derive(Debug, Clone)]
pub struct TabPane<'a> {
    /// Control or heading label.
    pub title: String,
    /// The pane element itself.
    pub root: Selection<'a>,
    /// Outer HTML of the pane.
    pub raw_html: String,
    /// Visible text, one block per line.
    pub plain_text: String,
    /// Resolver that found it.
    pub platform: PlatformSource,
}

impl<'a> TabPane<'a> {
    /// Capture a pane element.
    #[must_use]
    pub fn new(title: impl Into<String>, root: Selection<'a>, platform: PlatformSource) -> Self {
        let raw_html = dom::outer_html(&root).to_string();
        let plain_text = dom::visible_lines(&root).join("\n");
        Self {
            title: clean_label(&title.into()),
            root,
            raw_html,
            plain_text,
            platform,
        }
    }

    fn is_blank(&self) -> bool {
        self.plain_text.trim().is_empty() && !self.root.select("img, a[href]").exists()
    }
}

/// One tab/accordion idiom.
pub trait PaneExtractor: Send + Sync {
    /// Tag recorded on panes from this extractor.
    fn platform(&self) -> PlatformSource;

    /// Every pane of `doc` whose label names `section`, in document order.
    fn extract<'a>(&self, doc: &'a Document, section: Section, mode: MatchMode) -> Vec<TabPane<'a>>;
}

/// Priority-ordered list of pane extractors. The first one that yields any
/// pane wins.
pub struct PaneChain {
    extractors: Vec<Box<dyn PaneExtractor>>,
}

impl Default for PaneChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(GenericPanes),
            Box::new(WooCommercePanes),
            Box::new(BigCommercePanes),
            Box::new(ShopifyPanes),
        ])
    }
}

impl fmt::Debug for PaneChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.extractors.iter().map(|e| e.platform()))
            .finish()
    }
}

impl PaneChain {
    /// Chain over `extractors`, highest priority first.
    #[must_use]
    pub fn new(extractors: Vec<Box<dyn PaneExtractor>>) -> Self {
        Self { extractors }
    }

    /// Panes of the first extractor that finds any, deduplicated by element.
    #[must_use]
    pub fn resolve<'a>(&self, doc: &'a Document, section: Section, mode: MatchMode) -> Vec<TabPane<'a>> {
        for extractor in &self.extractors {
            let panes = dedupe_panes(extractor.extract(doc, section, mode));
            if !panes.is_empty() {
                debug!(section = %section, platform = %extractor.platform(), count = panes.len(), "resolved panes");
                return panes;
            }
        }
        Vec::new()
    }
}

fn dedupe_panes(panes: Vec<TabPane<'_>>) -> Vec<TabPane<'_>> {
    let mut seen = HashSet::new();
    panes
        .into_iter()
        .filter(|p| !p.is_blank())
        .filter(|p| dom::node_id(&p.root).is_some_and(|id| seen.insert(id)))
        .collect()
}

static DEFAULT_CHAIN: LazyLock<PaneChain> = LazyLock::new(PaneChain::default);

/// The built-in chain, shared by contexts that were not given their own.
#[must_use]
pub fn default_chain() -> &'static PaneChain {
    &DEFAULT_CHAIN
}

/// Every pane whose label mentions the section, through the built-in chain.
#[must_use]
pub fn resolve_all_panes(doc: &Document, section: Section) -> Vec<TabPane<'_>> {
    default_chain().resolve(doc, section, MatchMode::Contains)
}

/// Harvest every section's panes into `record`.
///
/// Specs keep the first non-empty value per key; features, manuals and
/// images are appended when new; the description is replaced by a longer
/// one, with repeated lines removed. Panes are resolved through the
/// context's chain. Returns the number of panes read.
pub fn harvest(doc: &Document, record: &mut ProductRecord, ctx: &ExtractContext<'_>) -> usize {
    let mut harvested = 0;

    for section in Section::ALL {
        for pane in ctx.panes.resolve(doc, section, MatchMode::Contains) {
            debug!(section = %section, title = %pane.title, platform = %pane.platform, "harvesting pane");
            let candidate = extractor::extract_pane(&pane.root, section, ctx);
            harvested += 1;

            for (key, value) in candidate.specs {
                record.insert_spec(key, value);
            }
            for feature in candidate.features {
                record.push_feature(feature);
            }
            for manual in candidate.manuals {
                record.push_manual(manual);
            }
            for image in candidate.images {
                record.push_image(image);
            }
            if let Some(description) = candidate.description {
                record.description = merge_description(&record.description, &description);
            }
        }
    }

    harvested
}

/// Longer text wins. Lines of the shorter text it does not already contain
/// are appended, and repeated lines (case-insensitive) are removed.
#[must_use]
pub fn merge_description(current: &str, incoming: &str) -> String {
    let (longer, shorter) = if incoming.chars().count() > current.chars().count() {
        (incoming, current)
    } else {
        (current, incoming)
    };
    let mut lines: Vec<String> = Vec::new();
    for line in longer.lines().map(dom::normalize_ws) {
        push_unique_ci(&mut lines, line);
    }
    let covered = lines.join("\n").to_lowercase();
    for line in shorter.lines().map(dom::normalize_ws) {
        if !covered.contains(&line.to_lowercase()) {
            push_unique_ci(&mut lines, line);
        }
    }
    lines.join("\n")
}
