//! Stage orchestration.
//!
//! One ingestion runs its stages in order: fetch, structured data, DOM
//! heuristics, tab harvest, PDF enrichment, then cleanup. The HTML-only stages
//! live on [`Extractor`], which needs no network; [`Ingestor`] wraps it with
//! the fetch layer and the manual enricher.
//!
//! The parsed document never lives across an await: all DOM work finishes in
//! one synchronous step before manuals are downloaded.

use std::time::Instant;

use tracing::{debug, info, warn};
use url::Url;

use crate::dom;
use crate::error::{Error, Result};
use crate::extractor::{self, ExtractContext};
use crate::fetch::Fetcher;
use crate::noise::{NoiseFilter, FEATURES_MERGED_CAP};
use crate::options::{FetchConfig, Options, PdfConfig};
use crate::pdf::PdfEnricher;
use crate::qa::{self, QaRules};
use crate::result::{Diagnostics, ManualDocument, ProductRecord, PublishedRecord, StageTiming};
use crate::structured::{self, StructuredSource};
use crate::tabs::{self, PaneChain};

/// A finished ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutput {
    /// The normalized record.
    pub record: ProductRecord,
    /// Stage timings, warnings and QA findings.
    pub diagnostics: Diagnostics,
    /// Per-manual findings when enrichment ran.
    pub manuals: Vec<ManualDocument>,
}

impl IngestOutput {
    /// Published shape: markdown renderings when `options.markdown`,
    /// diagnostics when `options.debug`.
    #[must_use]
    pub fn published(&self, options: &Options) -> PublishedRecord {
        let mut published = self.record.to_published(options.markdown);
        if options.debug {
            published.diagnostics = Some(self.diagnostics.clone());
        }
        published
    }
}

fn finish_stage(diagnostics: &mut Diagnostics, stage: &'static str, started: Instant) {
    let millis = started.elapsed().as_millis();
    debug!(stage, millis = millis as u64, "stage finished");
    diagnostics.timings.push(StageTiming { stage, millis });
}

/// HTML-only extraction: structured data, DOM heuristics, tab harvest and cleanup.
pub struct Extractor {
    filter: NoiseFilter,
    sources: Vec<Box<dyn StructuredSource>>,
    panes: PaneChain,
    qa_rules: QaRules,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(NoiseFilter::default())
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("sources", &self.sources.len())
            .field("panes", &self.panes)
            .field("qa_rules", &self.qa_rules)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Extractor with the built-in structured sources and pane chain.
    #[must_use]
    pub fn new(filter: NoiseFilter) -> Self {
        Self {
            filter,
            sources: structured::default_sources(),
            panes: PaneChain::default(),
            qa_rules: QaRules::default(),
        }
    }

    /// Replace the structured-data sources.
    #[must_use]
    pub fn with_sources(mut self, sources: Vec<Box<dyn StructuredSource>>) -> Self {
        self.sources = sources;
        self
    }

    /// Replace the pane extractor chain.
    #[must_use]
    pub fn with_panes(mut self, panes: PaneChain) -> Self {
        self.panes = panes;
        self
    }

    /// Replace the QA rules used in debug mode.
    #[must_use]
    pub fn with_qa_rules(mut self, rules: QaRules) -> Self {
        self.qa_rules = rules;
        self
    }

    /// The noise filter.
    #[must_use]
    pub fn filter(&self) -> &NoiseFilter {
        &self.filter
    }

    /// Extract a record from `html` without any network access.
    ///
    /// # Errors
    /// `NoContent` when neither a name nor a description was found.
    pub fn extract(&self, html: &str, options: &Options) -> Result<IngestOutput> {
        let started = Instant::now();
        let mut diagnostics = Diagnostics::started_now();
        let source = options.url.clone().unwrap_or_default();

        let mut record = self.extract_record(html, &source, options, &mut diagnostics);
        if !record.has_content() {
            return Err(Error::NoContent);
        }
        self.finish(&mut record, options, &mut diagnostics, started);

        Ok(IngestOutput {
            record,
            diagnostics,
            manuals: Vec::new(),
        })
    }

    /// Structured, DOM and harvest stages.
    fn extract_record(
        &self,
        html: &str,
        source: &str,
        options: &Options,
        diagnostics: &mut Diagnostics,
    ) -> ProductRecord {
        let mut record = ProductRecord::new(source);
        let doc = dom::parse(html);
        let base = Url::parse(source).ok();
        let ctx = ExtractContext::new(base.clone(), options, &self.filter).with_panes(&self.panes);

        let started = Instant::now();
        let structured = structured::extract_structured(&doc, base.as_ref(), &self.sources, diagnostics)
            .map(|candidate| self.filter.clean_candidate(candidate));
        finish_stage(diagnostics, "structured", started);

        let started = Instant::now();
        let dom_candidate = extractor::extract_dom(&doc, &ctx, structured.as_ref());
        // structured images were ranked together with the page images
        if let Some(mut candidate) = structured {
            candidate.images.clear();
            record.absorb(candidate);
        }
        record.absorb(dom_candidate);
        finish_stage(diagnostics, "dom", started);

        if options.harvest {
            let started = Instant::now();
            let ctx = ctx.with_hints(Some(record.name.clone()), record.sku.clone());
            let panes = tabs::harvest(&doc, &mut record, &ctx);
            debug!(panes, "tab harvest");
            finish_stage(diagnostics, "harvest", started);
        }

        record
    }

    /// Sanitize, cap, validate and check the request budget.
    fn finish(&self, record: &mut ProductRecord, options: &Options, diagnostics: &mut Diagnostics, started: Instant) {
        if options.sanitize {
            let stage_started = Instant::now();
            self.filter.sanitize_record(record, options.max_images, options.max_manuals);
            finish_stage(diagnostics, "sanitize", stage_started);
        }

        record.features.truncate(FEATURES_MERGED_CAP);
        record.images.truncate(options.max_images);
        record.manuals.truncate(options.max_manuals);

        if options.debug {
            diagnostics.qa = qa::validate(record, &self.qa_rules);
        }

        let elapsed = started.elapsed();
        if elapsed > options.request_timeout {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = options.request_timeout.as_millis() as u64,
                "ingestion exceeded its time budget"
            );
            diagnostics.warn(format!(
                "request took {} ms, budget {} ms",
                elapsed.as_millis(),
                options.request_timeout.as_millis()
            ));
        }
    }
}

/// Full ingestion: fetch, extract, enrich.
#[derive(Debug)]
pub struct Ingestor {
    fetcher: Fetcher,
    enricher: PdfEnricher,
    extractor: Extractor,
}

impl Ingestor {
    /// Ingestor over the production transport, PDF and OCR backends.
    pub fn new(fetch: FetchConfig, pdf: PdfConfig) -> Result<Self> {
        let fetcher = Fetcher::new(fetch)?;
        let enricher = PdfEnricher::new(fetcher.client(), pdf);
        Ok(Self::with_parts(fetcher, enricher, Extractor::default()))
    }

    /// Ingestor from explicit parts.
    #[must_use]
    pub fn with_parts(fetcher: Fetcher, enricher: PdfEnricher, extractor: Extractor) -> Self {
        Self {
            fetcher,
            enricher,
            extractor,
        }
    }

    /// The HTML-only extractor.
    #[must_use]
    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Fetch `url` through the render service and ingest it.
    ///
    /// # Errors
    /// Input and fetch errors from the fetch layer, `NoContent` when the page
    /// has neither a name nor a description.
    pub async fn ingest(&self, url: &str, options: &Options) -> Result<IngestOutput> {
        let started = Instant::now();
        let mut diagnostics = Diagnostics::started_now();

        let stage_started = Instant::now();
        let page = self.fetcher.fetch_page(url, options).await?;
        finish_stage(&mut diagnostics, "fetch", stage_started);
        if !page.rendered {
            diagnostics.warn("render service unavailable, used direct fetch");
        }

        self.process(&page.html, &page.url, options, diagnostics, started).await
    }

    /// Ingest already-fetched HTML. Manual enrichment still downloads PDFs
    /// when enabled.
    ///
    /// # Errors
    /// `NoContent` when the page has neither a name nor a description.
    pub async fn ingest_html(&self, html: &str, options: &Options) -> Result<IngestOutput> {
        let source = options.url.clone().unwrap_or_default();
        self.process(html, &source, options, Diagnostics::started_now(), Instant::now()).await
    }

    async fn process(
        &self,
        html: &str,
        source: &str,
        options: &Options,
        mut diagnostics: Diagnostics,
        started: Instant,
    ) -> Result<IngestOutput> {
        let mut record = self.extractor.extract_record(html, source, options, &mut diagnostics);
        if !record.has_content() {
            info!(url = source, "no extractable name or description");
            return Err(Error::NoContent);
        }

        record.manuals.truncate(options.max_manuals);
        let mut manuals = Vec::new();
        if options.enrich_manuals {
            let stage_started = Instant::now();
            manuals = self
                .enricher
                .enrich(&mut record, self.extractor.filter(), &mut diagnostics)
                .await;
            finish_stage(&mut diagnostics, "pdf", stage_started);
        }

        self.extractor.finish(&mut record, options, &mut diagnostics, started);
        info!(
            url = source,
            specs = record.specs.len(),
            features = record.features.len(),
            images = record.images.len(),
            manuals = record.manuals.len(),
            "ingested"
        );

        Ok(IngestOutput {
            record,
            diagnostics,
            manuals,
        })
    }
}

#[cfg(test)]
mod tests {
    use dom_query::Document;

    use super::*;
    use crate::tabs::{MatchMode, PaneExtractor, PlatformSource, Section, TabPane};

    const PAGE: &str = r#"<html><head><title>Travel Walker | Shop</title></head><body>
        <main>
            <h1>Travel Walker</h1>
            <div class="product-description"><p>A light folding walker with padded handles and locking wheels.</p></div>
            <table><tr><th>Weight</th><td>9 lbs</td></tr><tr><th>Color</th><td>Silver</td></tr></table>
        </main>
    </body></html>"#;

    #[test]
    fn test_extract_without_network() {
        let options = Options {
            url: Some("https://shop.example.com/p/walker".into()),
            debug: true,
            ..Options::default()
        };
        let output = Extractor::default().extract(PAGE, &options).unwrap();

        assert_eq!(output.record.name, "Travel Walker");
        assert_eq!(output.record.source, "https://shop.example.com/p/walker");
        assert_eq!(output.record.specs.get("weight").map(String::as_str), Some("9 lb"));
        let stages: Vec<_> = output.diagnostics.timings.iter().map(|t| t.stage).collect();
        assert_eq!(stages, vec!["structured", "dom"]);
        assert!(output.diagnostics.started_at.as_deref().is_some_and(|t| t.ends_with('Z')));
        assert!(output.published(&options).diagnostics.is_some());
    }

    #[test]
    fn test_empty_page_is_no_content() {
        let err = Extractor::default()
            .extract("<html><body></body></html>", &Options::default())
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_diagnostics_hidden_without_debug() {
        let options = Options::default();
        let output = Extractor::default().extract(PAGE, &options).unwrap();
        assert!(output.published(&options).diagnostics.is_none());
        assert!(output.diagnostics.qa.is_empty());
    }

    #[test]
    fn test_custom_parts() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type": "Product", "name": "Structured Name"}</script></head>
            <body><h1>Heading Name</h1></body></html>"#;
        let options = Options {
            debug: true,
            harvest: true,
            ..Options::default()
        };
        let extractor = Extractor::default()
            .with_sources(Vec::new())
            .with_panes(PaneChain::new(Vec::new()))
            .with_qa_rules(QaRules {
                require_sku: true,
                ..QaRules::default()
            });

        let output = extractor.extract(html, &options).unwrap();
        assert_eq!(output.record.name, "Heading Name");
        assert!(output.diagnostics.qa.iter().any(|e| e == "Catalog: product code missing"));
    }

    /// Panes marked up as `data-drawer` sections, labelled by the attribute.
    struct DrawerPanes;

    impl PaneExtractor for DrawerPanes {
        fn platform(&self) -> PlatformSource {
            PlatformSource::Generic
        }

        fn extract<'a>(&self, doc: &'a Document, section: Section, mode: MatchMode) -> Vec<TabPane<'a>> {
            doc.select("[data-drawer]")
                .iter()
                .filter(|el| section.matches_label(&dom::attr(el, "data-drawer"), mode))
                .map(|el| TabPane::new(dom::attr(&el, "data-drawer"), el, PlatformSource::Generic))
                .collect()
        }
    }

    #[test]
    fn test_custom_pane_chain_drives_spec_extraction() {
        let html = r#"<html><body><main>
            <h1>Folding Scooter</h1>
            <table><tr><th>Weight</th><td>40 lbs</td></tr></table>
            <section data-drawer="Specifications"><p>Top Speed: 4 mph</p></section>
        </main></body></html>"#;
        let options = Options::default();

        let default = Extractor::default().extract(html, &options).unwrap().record;
        assert!(default.specs.contains_key("weight"));

        let custom = Extractor::default()
            .with_panes(PaneChain::new(vec![Box::new(DrawerPanes)]))
            .extract(html, &options)
            .unwrap()
            .record;
        assert_eq!(custom.specs.get("top_speed").map(String::as_str), Some("4 mph"));
        assert!(!custom.specs.contains_key("weight"));
    }

    #[test]
    fn test_advisory_timeout_is_recorded() {
        let options = Options {
            request_timeout: std::time::Duration::ZERO,
            ..Options::default()
        };
        let output = Extractor::default().extract(PAGE, &options).unwrap();
        assert!(output.diagnostics.warnings.iter().any(|w| w.contains("budget")));
    }
}
