//! Result types for ingestion output.
//!
//! `ProductRecord` is the central record mutated additively by each pipeline
//! stage. `Candidate` is the transient per-source shape merged into it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::markdown;
use crate::url_utils;

/// Origin of a candidate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// `<script type="application/ld+json">` product graph.
    JsonLd,
    /// `itemscope`/`itemprop` microdata.
    Microdata,
    /// `typeof`/`property` RDFa.
    Rdfa,
    /// DOM heuristics over the whole page.
    Dom,
    /// A harvested tab or accordion pane.
    Tab,
    /// A PDF manual.
    Pdf,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::JsonLd => "json-ld",
            Self::Microdata => "microdata",
            Self::Rdfa => "rdfa",
            Self::Dom => "dom",
            Self::Tab => "tab",
            Self::Pdf => "pdf",
        };
        f.write_str(name)
    }
}

/// Transient extraction result from one source, merged into a `ProductRecord`
/// and then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Where the values came from.
    pub provenance: Provenance,
    /// Product name.
    pub name: Option<String>,
    /// Brand or manufacturer.
    pub brand: Option<String>,
    /// Product code (SKU, MPN, model).
    pub sku: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Specification label/value pairs (labels may still be raw).
    pub specs: BTreeMap<String, String>,
    /// Feature bullets in document order.
    pub features: Vec<String>,
    /// Image URLs in document order.
    pub images: Vec<String>,
    /// Manual (PDF) URLs in document order.
    pub manuals: Vec<String>,
}

impl Candidate {
    /// Empty candidate tagged with its source.
    #[must_use]
    pub fn new(provenance: Provenance) -> Self {
        Self {
            provenance,
            name: None,
            brand: None,
            sku: None,
            description: None,
            specs: BTreeMap::new(),
            features: Vec::new(),
            images: Vec::new(),
            manuals: Vec::new(),
        }
    }

    /// True when the candidate carries no value at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.brand.is_none()
            && self.sku.is_none()
            && self.description.is_none()
            && self.specs.is_empty()
            && self.features.is_empty()
            && self.images.is_empty()
            && self.manuals.is_empty()
    }

    /// Merge `other` into `self`: first non-empty wins for scalars, union with
    /// first-seen order (case-insensitive dedup) for lists, first value wins per spec key.
    pub fn merge(&mut self, other: Candidate) {
        fill(&mut self.name, other.name);
        fill(&mut self.brand, other.brand);
        fill(&mut self.sku, other.sku);
        fill(&mut self.description, other.description);
        for (key, value) in other.specs {
            self.specs.entry(key).or_insert(value);
        }
        for feature in other.features {
            push_unique_ci(&mut self.features, feature);
        }
        for image in other.images {
            push_unique_ci(&mut self.images, image);
        }
        for manual in other.manuals {
            push_unique_ci(&mut self.manuals, manual);
        }
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.as_deref().is_none_or(|s| s.trim().is_empty()) {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            *slot = Some(v);
        }
    }
}

/// Push `value` unless an entry equal ignoring case is already present.
pub(crate) fn push_unique_ci(list: &mut Vec<String>, value: String) -> bool {
    let lower = value.to_lowercase();
    if value.trim().is_empty() || list.iter().any(|v| v.to_lowercase() == lower) {
        return false;
    }
    list.push(value);
    true
}

/// A product image reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Absolute image URL.
    pub url: String,
}

/// One fetched (or failed) manual document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManualDocument {
    /// URL as listed on the product page.
    pub url: String,
    /// URL that finally yielded the PDF, if any.
    pub resolved_url: Option<String>,
    /// Extracted or OCR'd text.
    pub text: String,
    /// `Key: Value` pairs mined from the text.
    pub key_value_pairs: BTreeMap<String, String>,
    /// Tables as sequences of rows.
    pub tables: Vec<Vec<Vec<String>>>,
    /// Text came from OCR rather than the text layer.
    pub used_ocr: bool,
    /// Every retrieval step failed.
    pub failed: bool,
}

/// Findings of the PDF enrichment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PdfEnrichment {
    /// Raw text concatenated across all manuals.
    pub pdf_text: String,
    /// Key/value pairs merged across manuals (canonical keys).
    pub pdf_kv: BTreeMap<String, String>,
    /// All tables across manuals.
    pub pdf_tables: Vec<Vec<Vec<String>>>,
    /// Manual URLs that failed every step.
    pub manuals_failed: Vec<String>,
}

/// Timing of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTiming {
    /// Stage name.
    pub stage: &'static str,
    /// Elapsed milliseconds.
    pub millis: u128,
}

/// Internal timing and warning diagnostics, only published on request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// RFC 3339 UTC start time of the ingestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    /// Per-stage timings in execution order.
    pub timings: Vec<StageTiming>,
    /// Non-fatal problems encountered during ingestion.
    pub warnings: Vec<String>,
    /// Content-rule violations of the finished record.
    pub qa: Vec<String>,
}

impl Diagnostics {
    /// Diagnostics stamped with the current UTC time.
    #[must_use]
    pub fn started_now() -> Self {
        Self {
            started_at: Some(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            ..Self::default()
        }
    }

    /// Record a non-fatal warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// The normalized product record.
///
/// Created fresh per ingestion request; mutated additively by each pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductRecord {
    /// Origin URL.
    pub source: String,
    /// Product name.
    pub name: String,
    /// Brand or manufacturer.
    pub brand: Option<String>,
    /// Product code (SKU, MPN, model).
    pub sku: Option<String>,
    /// Free-text description.
    pub description: String,
    /// Canonical snake_case key -> normalized value.
    pub specs: BTreeMap<String, String>,
    /// Feature bullets, deduplicated case-insensitively.
    pub features: Vec<String>,
    /// Images, deduplicated by filename.
    pub images: Vec<ImageRef>,
    /// Manual PDF URLs.
    pub manuals: Vec<String>,
    /// Present when the PDF enrichment pass ran.
    pub enrichment: Option<PdfEnrichment>,
}

impl ProductRecord {
    /// Empty record for `source`.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// True when a usable name or description exists.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.name.trim().is_empty() || !self.description.trim().is_empty()
    }

    /// Merge a candidate by precedence: first non-empty wins for scalars,
    /// additive for specs (existing keys win), features, images and manuals.
    pub fn absorb(&mut self, candidate: Candidate) {
        if self.name.trim().is_empty() {
            if let Some(name) = candidate.name {
                self.name = name;
            }
        }
        fill(&mut self.brand, candidate.brand);
        fill(&mut self.sku, candidate.sku);
        if self.description.trim().is_empty() {
            if let Some(description) = candidate.description {
                self.description = description;
            }
        }
        for (key, value) in candidate.specs {
            self.insert_spec(key, value);
        }
        for feature in candidate.features {
            self.push_feature(feature);
        }
        for image in candidate.images {
            self.push_image(image);
        }
        for manual in candidate.manuals {
            self.push_manual(manual);
        }
    }

    /// Insert a spec unless the key already holds a non-empty value.
    pub fn insert_spec(&mut self, key: String, value: String) -> bool {
        if value.trim().is_empty() {
            return false;
        }
        match self.specs.get(&key) {
            Some(existing) if !existing.trim().is_empty() => false,
            _ => {
                self.specs.insert(key, value);
                true
            }
        }
    }

    /// Append a feature unless present (case-insensitive).
    pub fn push_feature(&mut self, feature: String) -> bool {
        push_unique_ci(&mut self.features, feature)
    }

    /// Append an image unless one with the same base filename is present.
    pub fn push_image(&mut self, url: String) -> bool {
        let key = url_utils::image_dedup_key(&url);
        if url.trim().is_empty()
            || self.images.iter().any(|i| url_utils::image_dedup_key(&i.url) == key)
        {
            return false;
        }
        self.images.push(ImageRef { url });
        true
    }

    /// Append a manual URL unless present.
    pub fn push_manual(&mut self, url: String) -> bool {
        let normalized = url_utils::normalize_url(&url);
        if url.trim().is_empty()
            || self.manuals.iter().any(|m| url_utils::normalize_url(m) == normalized)
        {
            return false;
        }
        self.manuals.push(url);
        true
    }

    /// Published shape consumed by downstream collaborators.
    #[must_use]
    pub fn to_published(&self, with_markdown: bool) -> PublishedRecord {
        let (description_md, features_md, specs_md) = if with_markdown {
            (
                Some(markdown::description_to_markdown(&self.description)),
                Some(markdown::features_to_markdown(&self.features)),
                Some(markdown::specs_to_markdown(&self.specs)),
            )
        } else {
            (None, None, None)
        };

        let enrichment = self.enrichment.clone().unwrap_or_default();
        let enriched = self.enrichment.is_some();

        PublishedRecord {
            source: self.source.clone(),
            name_raw: self.name.clone(),
            description_raw: self.description.clone(),
            specs: self.specs.clone(),
            features_raw: self.features.clone(),
            images: self.images.clone(),
            manuals: self.manuals.clone(),
            brand: self.brand.clone(),
            sku: self.sku.clone(),
            description_md,
            features_md,
            specs_md,
            pdf_text: enriched.then(|| enrichment.pdf_text.clone()),
            pdf_kv: enriched.then(|| enrichment.pdf_kv.clone()),
            pdf_tables: enriched.then(|| enrichment.pdf_tables.clone()),
            manuals_failed: enriched.then(|| enrichment.manuals_failed.clone()),
            diagnostics: None,
        }
    }
}

/// Wire shape of a finished record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedRecord {
    pub source: String,
    pub name_raw: String,
    pub description_raw: String,
    pub specs: BTreeMap<String, String>,
    pub features_raw: Vec<String>,
    pub images: Vec<ImageRef>,
    pub manuals: Vec<String>,
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_md: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features_md: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specs_md: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_kv: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_tables: Option<Vec<Vec<Vec<String>>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manuals_failed: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: Option<&str>, features: &[&str]) -> Candidate {
        Candidate {
            name: name.map(str::to_string),
            features: features.iter().map(|s| (*s).to_string()).collect(),
            ..Candidate::new(Provenance::JsonLd)
        }
    }

    #[test]
    fn merge_keeps_first_non_empty_scalar() {
        let mut first = candidate(Some(""), &[]);
        first.merge(candidate(Some("Walker Pro"), &[]));
        first.merge(candidate(Some("Other"), &[]));
        assert_eq!(first.name.as_deref(), Some("Walker Pro"));
    }

    #[test]
    fn merge_unions_lists_in_first_seen_order() {
        let mut first = candidate(None, &["Folds flat", "Lightweight"]);
        first.merge(candidate(None, &["lightweight", "Adjustable height"]));
        assert_eq!(first.features, vec!["Folds flat", "Lightweight", "Adjustable height"]);
    }

    #[test]
    fn candidate_and_record_fold_non_ascii_case_alike() {
        let mut first = candidate(None, &["Bezug aus ÖKO-Leder"]);
        first.merge(candidate(None, &["bezug aus öko-leder", "Élévation réglable"]));
        assert_eq!(first.features, vec!["Bezug aus ÖKO-Leder", "Élévation réglable"]);

        let mut record = ProductRecord::new("https://shop.example.com/p/1");
        record.absorb(first);
        assert!(!record.push_feature("ÉLÉVATION RÉGLABLE".into()));
        assert_eq!(record.features.len(), 2);
    }

    #[test]
    fn absorb_does_not_overwrite_existing_specs() {
        let mut record = ProductRecord::new("https://shop.example.com/p/1");
        record.specs.insert("weight".into(), "12 lb".into());

        let mut cand = Candidate::new(Provenance::Dom);
        cand.specs.insert("weight".into(), "99 lb".into());
        cand.specs.insert("color".into(), "Blue".into());
        record.absorb(cand);

        assert_eq!(record.specs.get("weight").map(String::as_str), Some("12 lb"));
        assert_eq!(record.specs.get("color").map(String::as_str), Some("Blue"));
    }

    #[test]
    fn images_dedup_by_filename_without_query() {
        let mut record = ProductRecord::new("s");
        assert!(record.push_image("https://cdn.example.com/a/chair.jpg?v=1".into()));
        assert!(!record.push_image("https://img.example.com/b/chair.jpg?v=2".into()));
        assert!(record.push_image("https://cdn.example.com/a/chair-side.jpg".into()));
        assert_eq!(record.images.len(), 2);
    }

    #[test]
    fn published_shape_omits_enrichment_when_not_run() {
        let record = ProductRecord {
            name: "Chair".into(),
            ..ProductRecord::new("https://shop.example.com/chair")
        };
        let json = serde_json::to_value(record.to_published(false)).unwrap_or_default();
        assert_eq!(json["name_raw"], "Chair");
        assert!(json.get("pdf_text").is_none());
        assert!(json.get("description_md").is_none());
    }

    #[test]
    fn published_shape_includes_enrichment_when_run() {
        let record = ProductRecord {
            enrichment: Some(PdfEnrichment::default()),
            ..ProductRecord::new("s")
        };
        let json = serde_json::to_value(record.to_published(true)).unwrap_or_default();
        assert_eq!(json["manuals_failed"], serde_json::json!([]));
        assert!(json.get("specs_md").is_some());
    }
}
