//! PDF manual enrichment.
//!
//! Every manual URL on the record is downloaded (with URL-variant, header and
//! landing-page fallbacks), read through its text layer, and OCR'd when the
//! text layer is empty. Key/value pairs and two-column table rows become
//! specs unless the key is already set, feature-shaped lines become features
//! up to a cap, and the raw text is kept alongside.
//!
//! Manuals are processed concurrently on a small worker pool. A manual that
//! cannot be retrieved is recorded in `manuals_failed`; it never affects the
//! others.

pub mod fetch;
pub mod ocr;
pub mod text;

use std::convert::Infallible;
use std::sync::Arc;

use tracing::{debug, info, warn};

pub use fetch::{candidate_urls, classify, landing_pdf_links, ContentKind, ManualFetcher, PdfBytes};
pub use ocr::{OcrEngine, TesseractOcr};
pub use text::{PdfExtractText, PdfTextExtractor};

use crate::batch;
use crate::fetch::HttpClient;
use crate::noise::NoiseFilter;
use crate::options::PdfConfig;
use crate::patterns::KEY_VALUE_LINE;
use crate::result::{Diagnostics, ManualDocument, PdfEnrichment, ProductRecord};

/// Failure of one manual. Never escapes the enrichment pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManualError {
    /// No URL variant or header set produced a successful response.
    #[error("no variant of {0} could be fetched")]
    Unreachable(String),

    /// The manual URL points at an internal or otherwise disallowed host.
    #[error("blocked manual target: {0}")]
    Blocked(String),

    /// The response was neither a PDF nor a landing page linking to one.
    #[error("{0} did not lead to a PDF")]
    NotPdf(String),

    /// The text layer could not be read.
    #[error("text extraction failed: {0}")]
    Extract(String),

    /// Rasterizing or recognizing the pages failed.
    #[error("OCR failed: {0}")]
    Ocr(String),
}

/// Downloads and mines the manuals of a record.
pub struct PdfEnricher {
    fetcher: ManualFetcher,
    text: Arc<dyn PdfTextExtractor>,
    ocr: Arc<dyn OcrEngine>,
    config: PdfConfig,
}

impl std::fmt::Debug for PdfEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfEnricher").field("config", &self.config).finish_non_exhaustive()
    }
}

impl PdfEnricher {
    /// Enricher with the `pdf-extract` text backend and the command-line OCR pipeline.
    #[must_use]
    pub fn new(client: Arc<dyn HttpClient>, config: PdfConfig) -> Self {
        let ocr = TesseractOcr::with_max_pages(config.ocr_max_pages);
        Self::with_backends(client, Arc::new(PdfExtractText), Arc::new(ocr), config)
    }

    /// Enricher with explicit text and OCR backends.
    #[must_use]
    pub fn with_backends(
        client: Arc<dyn HttpClient>,
        text: Arc<dyn PdfTextExtractor>,
        ocr: Arc<dyn OcrEngine>,
        config: PdfConfig,
    ) -> Self {
        Self {
            fetcher: ManualFetcher::new(client, config.clone()),
            text,
            ocr,
            config,
        }
    }

    async fn extract_text(&self, bytes: Arc<Vec<u8>>) -> Result<String, ManualError> {
        let extractor = Arc::clone(&self.text);
        tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .map_err(|e| ManualError::Extract(format!("extractor aborted: {e}")))?
    }

    /// Retrieve and read one manual.
    pub async fn read_manual(&self, url: &str, filter: &NoiseFilter) -> ManualDocument {
        let pdf = match self.fetcher.download(url).await {
            Ok(pdf) => pdf,
            Err(err) => {
                warn!(url, error = %err, "manual unavailable");
                return ManualDocument {
                    url: url.to_string(),
                    failed: true,
                    ..ManualDocument::default()
                };
            }
        };

        let bytes = Arc::new(pdf.bytes);
        let mut text = self.extract_text(Arc::clone(&bytes)).await.unwrap_or_else(|err| {
            warn!(url, error = %err, "text layer unreadable");
            String::new()
        });

        let mut used_ocr = false;
        if text.trim().is_empty() {
            debug!(url, "empty text layer, running OCR");
            match self.ocr.ocr(&bytes).await {
                Ok(recognized) => {
                    used_ocr = !recognized.trim().is_empty();
                    text = recognized;
                }
                Err(err) => warn!(url, error = %err, "OCR failed"),
            }
        }

        ManualDocument {
            url: url.to_string(),
            resolved_url: Some(pdf.url),
            key_value_pairs: text::key_values(&text, filter),
            tables: text::tables(&text),
            text,
            used_ocr,
            failed: false,
        }
    }

    /// Read every manual of `record` and merge the findings into it.
    ///
    /// Returns the per-manual documents in the order of `record.manuals`.
    pub async fn enrich(
        &self,
        record: &mut ProductRecord,
        filter: &NoiseFilter,
        diagnostics: &mut Diagnostics,
    ) -> Vec<ManualDocument> {
        let urls = record.manuals.clone();
        let documents: Vec<ManualDocument> = batch::run_bounded(urls, self.config.workers, |url| async move {
            Ok::<_, Infallible>(self.read_manual(&url, filter).await)
        })
        .await
        .into_iter()
        .filter_map(Result::ok)
        .collect();

        for doc in documents.iter().filter(|d| d.failed) {
            diagnostics.warn(format!("manual failed: {}", doc.url));
        }
        merge_manuals(record, &documents, filter, self.config.max_features);
        info!(
            manuals = documents.len(),
            failed = documents.iter().filter(|d| d.failed).count(),
            "manual enrichment finished"
        );
        documents
    }
}

/// Merge manual findings into `record` and attach the enrichment summary.
///
/// Specs only fill keys the record does not have yet. Feature lines pass
/// through the noise filter and stop once the record holds `max_features`
/// features. Lines shaped like `Key: Value` are left to the specs.
pub fn merge_manuals(
    record: &mut ProductRecord,
    documents: &[ManualDocument],
    filter: &NoiseFilter,
    max_features: usize,
) {
    let mut enrichment = PdfEnrichment::default();
    let mut texts = Vec::new();
    let mut feature_candidates = Vec::new();

    for doc in documents {
        if doc.failed {
            enrichment.manuals_failed.push(doc.url.clone());
            continue;
        }
        for (key, value) in &doc.key_value_pairs {
            enrichment.pdf_kv.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for (key, value) in text::table_pairs(&doc.tables, filter) {
            enrichment.pdf_kv.entry(key).or_insert(value);
        }
        enrichment.pdf_tables.extend(doc.tables.iter().cloned());

        let trimmed = doc.text.trim();
        if !trimmed.is_empty() {
            texts.push(trimmed.to_string());
        }
        feature_candidates.extend(
            text::feature_lines(&doc.text)
                .into_iter()
                .filter(|line| !KEY_VALUE_LINE.is_match(line)),
        );
    }

    for (key, value) in &enrichment.pdf_kv {
        record.insert_spec(key.clone(), value.clone());
    }

    for feature in filter.clean_lines(&feature_candidates, max_features) {
        if record.features.len() >= max_features {
            break;
        }
        record.push_feature(feature);
    }

    enrichment.pdf_text = texts.join("\n\n");
    record.enrichment = Some(enrichment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn doc(url: &str, text: &str, kv: &[(&str, &str)]) -> ManualDocument {
        ManualDocument {
            url: url.to_string(),
            resolved_url: Some(url.to_string()),
            text: text.to_string(),
            key_value_pairs: kv.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
            ..ManualDocument::default()
        }
    }

    #[test]
    fn test_existing_specs_win() {
        let mut record = ProductRecord::new("https://shop.example.com/p");
        record.specs.insert("weight_capacity".into(), "300 lb".into());

        let docs = vec![doc(
            "https://shop.example.com/m.pdf",
            "",
            &[("weight_capacity", "350 lb"), ("top_speed", "4.25 mph")],
        )];
        merge_manuals(&mut record, &docs, &NoiseFilter::default(), 20);

        assert_eq!(record.specs.get("weight_capacity").map(String::as_str), Some("300 lb"));
        assert_eq!(record.specs.get("top_speed").map(String::as_str), Some("4.25 mph"));
        let enrichment = record.enrichment.unwrap();
        assert_eq!(enrichment.pdf_kv.len(), 2);
        assert!(enrichment.manuals_failed.is_empty());
    }

    #[test]
    fn test_failed_manuals_are_recorded_and_skipped() {
        let mut record = ProductRecord::new("https://shop.example.com/p");
        let failed = ManualDocument {
            url: "https://shop.example.com/gone.pdf".into(),
            failed: true,
            ..ManualDocument::default()
        };
        let docs = vec![failed, doc("https://shop.example.com/ok.pdf", "Folds flat for easy storage", &[])];
        merge_manuals(&mut record, &docs, &NoiseFilter::default(), 20);

        let enrichment = record.enrichment.unwrap();
        assert_eq!(enrichment.manuals_failed, vec!["https://shop.example.com/gone.pdf"]);
        assert_eq!(enrichment.pdf_text, "Folds flat for easy storage");
        assert_eq!(record.features, vec!["Folds flat for easy storage"]);
    }

    #[test]
    fn test_feature_cap_counts_existing_features() {
        let mut record = ProductRecord::new("https://shop.example.com/p");
        record.features = vec!["Lightweight aluminum frame".into()];
        let text = "Folds flat for easy storage\nPuncture-proof rear tires\nAdjustable armrest height";
        merge_manuals(&mut record, &[doc("https://x.example.com/m.pdf", text, &[])], &NoiseFilter::default(), 2);

        assert_eq!(record.features.len(), 2);
        assert_eq!(record.features[1], "Folds flat for easy storage");
    }

    #[test]
    fn test_table_rows_become_pairs() {
        let mut record = ProductRecord::new("https://shop.example.com/p");
        let mut manual = doc("https://x.example.com/m.pdf", "", &[]);
        manual.tables = vec![vec![
            vec!["Seat Width".into(), "18 in".into()],
            vec!["Turning Radius".into(), "42 in".into()],
        ]];
        merge_manuals(&mut record, &[manual], &NoiseFilter::default(), 20);

        let expected: BTreeMap<String, String> = [("seat_width", "18 in"), ("turning_radius", "42 in")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(record.specs, expected);
        assert_eq!(record.enrichment.unwrap().pdf_tables.len(), 1);
    }
}
