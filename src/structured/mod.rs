//! Structured-data extraction.
//!
//! Three independent sources read embedded product metadata: JSON-LD scripts,
//! `itemscope` microdata and RDFa `typeof` blocks. A failure in one source is
//! logged and recorded, and the others still run. Results are merged
//! left-to-right into a single [`Candidate`].

mod json_ld;
mod microdata;
mod rdfa;

use dom_query::Document;
use tracing::warn;
use url::Url;

pub use json_ld::JsonLdSource;
pub use microdata::MicrodataSource;
pub use rdfa::RdfaSource;

use crate::result::{push_unique_ci, Candidate, Diagnostics, Provenance};
use crate::url_utils;

/// Failure of a single structured-data source.
#[derive(Debug, thiserror::Error)]
pub enum StructuredError {
    /// Every script of the encoding failed to parse.
    #[error("malformed JSON in {count} script(s): {first}")]
    Json {
        /// Number of scripts that failed to parse.
        count: usize,
        /// First parse error message.
        first: String,
    },

    /// Markup was present but unusable.
    #[error("malformed markup: {0}")]
    Markup(String),
}

/// One structured-data encoding.
pub trait StructuredSource: Send + Sync {
    /// Provenance tag of candidates from this source.
    fn provenance(&self) -> Provenance;

    /// Extract a product candidate. An empty candidate means "no data".
    ///
    /// # Errors
    /// `StructuredError` when the encoding is present but cannot be read.
    fn extract(&self, doc: &Document, base: Option<&Url>) -> Result<Candidate, StructuredError>;
}

/// The built-in sources in precedence order: JSON-LD, microdata, RDFa.
#[must_use]
pub fn default_sources() -> Vec<Box<dyn StructuredSource>> {
    vec![
        Box::new(JsonLdSource),
        Box::new(MicrodataSource),
        Box::new(RdfaSource),
    ]
}

/// Run every source and merge the results left-to-right.
///
/// Scalars keep the first non-empty value, lists are unioned in first-seen
/// order, specs keep the first value per key. Returns `None` when no source
/// produced anything.
pub fn extract_structured(
    doc: &Document,
    base: Option<&Url>,
    sources: &[Box<dyn StructuredSource>],
    diagnostics: &mut Diagnostics,
) -> Option<Candidate> {
    let mut merged: Option<Candidate> = None;

    for source in sources {
        let candidate = match source.extract(doc, base) {
            Ok(candidate) => candidate,
            Err(err) => {
                let provenance = source.provenance();
                warn!(source = %provenance, error = %err, "structured data source failed");
                diagnostics.warn(format!("{provenance}: {err}"));
                continue;
            }
        };
        if candidate.is_empty() {
            continue;
        }
        match merged.as_mut() {
            Some(acc) => acc.merge(candidate),
            None => merged = Some(candidate),
        }
    }

    merged
}

/// Apply one schema.org product property to a candidate.
///
/// Shared by the microdata and RDFa readers, which both surface flat
/// `(property, value)` pairs. Unknown properties with short values become specs.
pub(crate) fn apply_property(candidate: &mut Candidate, property: &str, value: &str, base: Option<&Url>) {
    let value = crate::dom::normalize_ws(value);
    if value.is_empty() {
        return;
    }

    match property.to_ascii_lowercase().as_str() {
        "name" => set_if_empty(&mut candidate.name, value),
        "brand" | "manufacturer" => set_if_empty(&mut candidate.brand, value),
        "sku" | "mpn" | "productid" | "productnumber" => set_if_empty(&mut candidate.sku, value),
        "description" => set_if_empty(&mut candidate.description, value),
        "image" | "thumbnailurl" | "contenturl" => {
            if let Some(url) = url_utils::resolve(&value, base) {
                push_unique_ci(&mut candidate.images, url);
            }
        }
        "color" | "material" | "weight" | "width" | "height" | "depth" | "model" | "size"
        | "gtin" | "gtin8" | "gtin12" | "gtin13" | "gtin14" | "countryoforigin" => {
            candidate.specs.entry(property.to_string()).or_insert(value);
        }
        _ => {}
    }
}

fn set_if_empty(slot: &mut Option<String>, value: String) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// Whether a schema type string names a product (`Product`,
/// `http://schema.org/Product`, `schema:ProductGroup`, ...).
pub(crate) fn is_product_type(type_value: &str) -> bool {
    type_value.split_whitespace().any(|t| {
        let local = t
            .rsplit(['/', ':', '#'])
            .next()
            .unwrap_or(t)
            .to_ascii_lowercase();
        matches!(
            local.as_str(),
            "product" | "productgroup" | "productmodel" | "individualproduct" | "someproducts" | "vehicle"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl StructuredSource for Failing {
        fn provenance(&self) -> Provenance {
            Provenance::Microdata
        }

        fn extract(&self, _doc: &Document, _base: Option<&Url>) -> Result<Candidate, StructuredError> {
            Err(StructuredError::Markup("broken".into()))
        }
    }

    struct Fixed(Candidate);

    impl StructuredSource for Fixed {
        fn provenance(&self) -> Provenance {
            self.0.provenance
        }

        fn extract(&self, _doc: &Document, _base: Option<&Url>) -> Result<Candidate, StructuredError> {
            Ok(self.0.clone())
        }
    }

    fn fixed(name: Option<&str>, brand: Option<&str>, images: &[&str]) -> Box<dyn StructuredSource> {
        Box::new(Fixed(Candidate {
            name: name.map(str::to_string),
            brand: brand.map(str::to_string),
            images: images.iter().map(|s| (*s).to_string()).collect(),
            ..Candidate::new(Provenance::Rdfa)
        }))
    }

    #[test]
    fn failing_source_does_not_abort_others() {
        let doc = Document::from("<html></html>");
        let sources: Vec<Box<dyn StructuredSource>> =
            vec![Box::new(Failing), fixed(Some("Walker"), None, &[])];
        let mut diagnostics = Diagnostics::default();

        let merged = extract_structured(&doc, None, &sources, &mut diagnostics);

        assert_eq!(merged.and_then(|c| c.name).as_deref(), Some("Walker"));
        assert_eq!(diagnostics.warnings.len(), 1);
        assert!(diagnostics.warnings[0].contains("broken"));
    }

    #[test]
    fn merge_is_first_non_empty_and_ordered_union() {
        let doc = Document::from("<html></html>");
        let sources = vec![
            fixed(Some("First"), None, &["https://x.com/a.jpg"]),
            fixed(Some("Second"), Some("Acme"), &["https://x.com/A.jpg", "https://x.com/b.jpg"]),
        ];
        let mut diagnostics = Diagnostics::default();

        let merged = extract_structured(&doc, None, &sources, &mut diagnostics).unwrap_or_else(|| Candidate::new(Provenance::Dom));

        assert_eq!(merged.name.as_deref(), Some("First"));
        assert_eq!(merged.brand.as_deref(), Some("Acme"));
        assert_eq!(merged.images, vec!["https://x.com/a.jpg", "https://x.com/b.jpg"]);
    }

    #[test]
    fn no_sources_yield_none() {
        let doc = Document::from("<html></html>");
        let mut diagnostics = Diagnostics::default();
        assert!(extract_structured(&doc, None, &default_sources(), &mut diagnostics).is_none());
        assert!(diagnostics.warnings.is_empty());
    }

    #[test]
    fn product_types_are_recognized() {
        assert!(is_product_type("Product"));
        assert!(is_product_type("http://schema.org/Product"));
        assert!(is_product_type("schema:ProductGroup"));
        assert!(!is_product_type("BreadcrumbList"));
        assert!(!is_product_type("http://schema.org/Offer"));
    }
}
