//! Page-level product metadata: name, brand, product code and the meta
//! description used as a last description fallback.

use dom_query::{Document, Selection};

use crate::dom;
use crate::patterns::{TITLE_SELECTOR, TITLE_SEPARATOR};

const NAME_MAX_CHARS: usize = 255;

/// Product name: the first product `<h1>`, then `og:title`, then the leading
/// segment of `<title>`.
#[must_use]
pub fn product_name(doc: &Document) -> Option<String> {
    doc.select(TITLE_SELECTOR)
        .iter()
        .map(|h| dom::text(&h))
        .find(|t| is_plausible_name(t))
        .or_else(|| meta_content(doc, &["og:title", "twitter:title"]).filter(|t| is_plausible_name(t)))
        .or_else(|| title_element(doc))
}

/// `<title>` without the trailing site name.
#[must_use]
pub fn title_element(doc: &Document) -> Option<String> {
    let title = dom::text(&doc.select("title").first());
    if title.is_empty() {
        return None;
    }
    let first = TITLE_SEPARATOR.split(&title).next().unwrap_or(&title).trim().to_string();
    Some(first).filter(|t| is_plausible_name(t))
}

fn is_plausible_name(text: &str) -> bool {
    let len = text.chars().count();
    (2..=NAME_MAX_CHARS).contains(&len)
}

/// Brand from product meta tags or a labelled brand element.
#[must_use]
pub fn brand(doc: &Document) -> Option<String> {
    meta_content(doc, &["product:brand", "og:brand", "brand"]).or_else(|| {
        doc.select(".product-brand, .product__vendor, .product-vendor, .brand-name, [data-brand]")
            .iter()
            .map(|sel| {
                let value = dom::attr(&sel, "data-brand");
                if value.trim().is_empty() {
                    dom::text(&sel)
                } else {
                    dom::normalize_ws(&value)
                }
            })
            .map(|t| strip_label(&t, &["brand", "by", "manufacturer"]))
            .find(|t| !t.is_empty() && t.chars().count() <= 80)
    })
}

/// Product code from `data-sku` attributes, then labelled code elements.
#[must_use]
pub fn product_code(doc: &Document) -> Option<String> {
    for sel in doc.select("[data-sku], [data-product-sku]").iter() {
        let value = dom::attr(&sel, "data-sku");
        let value = if value.trim().is_empty() {
            dom::attr(&sel, "data-product-sku")
        } else {
            value
        };
        let value = dom::normalize_ws(&value);
        if is_plausible_code(&value) {
            return Some(value);
        }
    }

    doc.select(".sku, .product-sku, .product__sku, .product-code, .model-number, .product_meta .sku_wrapper")
        .iter()
        .map(|sel| strip_label(&dom::text(&sel), &["sku", "item", "model", "part", "product code", "item #", "model #"]))
        .find(|v| is_plausible_code(v))
}

fn is_plausible_code(value: &str) -> bool {
    let len = value.chars().count();
    (2..=64).contains(&len)
        && value.chars().any(|c| c.is_ascii_alphanumeric())
        && !value.contains(char::is_whitespace)
}

/// `<meta name="description">`, then `og:description`.
#[must_use]
pub fn meta_description(doc: &Document) -> Option<String> {
    meta_content(doc, &["description", "og:description", "twitter:description"])
}

/// First non-empty `content` of a meta tag whose `name`/`property` is one of `names`,
/// honoring the order of `names`.
fn meta_content(doc: &Document, names: &[&str]) -> Option<String> {
    let metas: Vec<(String, String)> = doc
        .select("meta[content]")
        .nodes()
        .iter()
        .map(|node| {
            let meta = Selection::from(*node);
            let key = dom::attr(&meta, "property");
            let key = if key.is_empty() { dom::attr(&meta, "name") } else { key };
            (key.to_lowercase(), dom::normalize_ws(&dom::attr(&meta, "content")))
        })
        .filter(|(key, content)| !key.is_empty() && !content.is_empty())
        .collect();

    names.iter().find_map(|wanted| {
        metas
            .iter()
            .find(|(key, _)| key == wanted)
            .map(|(_, content)| content.clone())
    })
}

/// Remove a leading `Label:` such as `SKU:` or `Brand:`.
fn strip_label(text: &str, labels: &[&str]) -> String {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    for label in labels {
        if let Some(rest) = lower.strip_prefix(label) {
            let rest_trimmed = rest.trim_start();
            if rest_trimmed.starts_with([':', '#', '.']) || rest.starts_with(char::is_whitespace) {
                let offset = trimmed.len() - rest_trimmed.len();
                return trimmed
                    .get(offset..)
                    .unwrap_or(trimmed)
                    .trim_start_matches([':', '#', '.'])
                    .trim()
                    .to_string();
            }
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_prefers_h1() {
        let doc = Document::from(
            r#"<head><title>Other | Shop</title><meta property="og:title" content="OG Name"></head>
            <body><h1 class="product-title">  Knee   Scooter </h1></body>"#,
        );
        assert_eq!(product_name(&doc).as_deref(), Some("Knee Scooter"));
    }

    #[test]
    fn test_name_falls_back_to_og_then_title() {
        let doc = Document::from(r#"<head><meta property="og:title" content="OG Name"></head><body></body>"#);
        assert_eq!(product_name(&doc).as_deref(), Some("OG Name"));

        let doc = Document::from("<head><title>Lift Chair - Acme Medical</title></head><body></body>");
        assert_eq!(product_name(&doc).as_deref(), Some("Lift Chair"));
    }

    #[test]
    fn test_brand_and_code() {
        let doc = Document::from(
            r#"<div class="product-brand">Brand: Acme</div>
            <span class="sku">SKU: RW-100</span>"#,
        );
        assert_eq!(brand(&doc).as_deref(), Some("Acme"));
        assert_eq!(product_code(&doc).as_deref(), Some("RW-100"));
    }

    #[test]
    fn test_data_sku_wins() {
        let doc = Document::from(r#"<div data-sku="KS-2"></div><span class="sku">Item: other</span>"#);
        assert_eq!(product_code(&doc).as_deref(), Some("KS-2"));
    }

    #[test]
    fn test_meta_description_order() {
        let doc = Document::from(
            r#"<head><meta property="og:description" content="From OG">
            <meta name="description" content="From meta"></head>"#,
        );
        assert_eq!(meta_description(&doc).as_deref(), Some("From meta"));
    }

    #[test]
    fn test_strip_label() {
        assert_eq!(strip_label("SKU: AB-1", &["sku"]), "AB-1");
        assert_eq!(strip_label("Model # X5", &["model"]), "X5");
        assert_eq!(strip_label("Skuba", &["sku"]), "Skuba");
    }
}
