//! JSON-LD product parsing.
//!
//! Reads `<script type="application/ld+json">` blocks, walks `@graph` arrays
//! and nested objects to find schema.org `Product` nodes, and maps their
//! properties onto a candidate. Shallower product nodes rank first.

use dom_query::{Document, Selection};
use serde_json::{Map, Value};
use url::Url;

use super::{is_product_type, StructuredError, StructuredSource};
use crate::json_walk::{self, UrlCollector, UrlKind};
use crate::result::{push_unique_ci, Candidate, Provenance};
use crate::url_utils;

/// JSON-LD structured-data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLdSource;

/// A product node with its nesting depth.
struct ProductNode<'a> {
    data: &'a Map<String, Value>,
    depth: usize,
}

impl StructuredSource for JsonLdSource {
    fn provenance(&self) -> Provenance {
        Provenance::JsonLd
    }

    fn extract(&self, doc: &Document, base: Option<&Url>) -> Result<Candidate, StructuredError> {
        let mut parsed = Vec::new();
        let mut errors = Vec::new();

        for script in doc.select(r#"script[type="application/ld+json"]"#).nodes() {
            let json_text = Selection::from(*script).text().trim().to_string();
            if json_text.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(&json_text) {
                Ok(value) => parsed.push(value),
                Err(err) => errors.push(err.to_string()),
            }
        }

        if parsed.is_empty() && !errors.is_empty() {
            return Err(StructuredError::Json {
                count: errors.len(),
                first: errors.swap_remove(0),
            });
        }

        let mut products = Vec::new();
        for value in &parsed {
            collect_products(value, 0, &mut products);
        }
        products.sort_by_key(|p| p.depth);

        let mut candidate = Candidate::new(Provenance::JsonLd);
        for product in &products {
            candidate.merge(product_candidate(product.data, base));
        }
        Ok(candidate)
    }
}

/// Recursively collect product-typed objects.
fn collect_products<'a>(value: &'a Value, depth: usize, out: &mut Vec<ProductNode<'a>>) {
    match value {
        Value::Object(map) => {
            let is_product = schema_types(map).iter().any(|t| is_product_type(t));
            if is_product {
                out.push(ProductNode { data: map, depth });
            }
            for (key, val) in map {
                // offers, reviews and breadcrumbs never hold the product itself
                if matches!(key.as_str(), "offers" | "review" | "aggregateRating" | "breadcrumb") {
                    continue;
                }
                collect_products(val, depth + 1, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_products(item, depth, out);
            }
        }
        _ => {}
    }
}

/// `@type` values of a schema object.
fn schema_types(map: &Map<String, Value>) -> Vec<String> {
    match map.get("@type") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn product_candidate(data: &Map<String, Value>, base: Option<&Url>) -> Candidate {
    let mut candidate = Candidate::new(Provenance::JsonLd);

    candidate.name = single_string(data, "name");
    candidate.brand = data.get("brand").or_else(|| data.get("manufacturer")).and_then(name_of);
    candidate.sku = ["sku", "mpn", "productID", "gtin13", "gtin12", "gtin"]
        .iter()
        .find_map(|key| single_string(data, key));
    candidate.description = single_string(data, "description");

    if let Some(image) = data.get("image") {
        for url in image_urls(image) {
            if let Some(url) = url_utils::resolve(&url, base) {
                push_unique_ci(&mut candidate.images, url);
            }
        }
    }

    for key in ["color", "material", "model", "size", "countryOfOrigin"] {
        if let Some(value) = data.get(key).and_then(name_of) {
            candidate.specs.insert(key.to_string(), value);
        }
    }
    for key in ["weight", "width", "height", "depth"] {
        if let Some(value) = data.get(key).and_then(quantitative_value) {
            candidate.specs.insert(key.to_string(), value);
        }
    }

    if let Some(Value::Array(properties)) = data.get("additionalProperty") {
        for property in properties.iter().filter_map(Value::as_object) {
            let Some(name) = single_string(property, "name") else {
                continue;
            };
            if let Some(value) = quantitative_value(&Value::Object(property.clone())) {
                candidate.specs.entry(name).or_insert(value);
            }
        }
    }

    let mut pdfs = UrlCollector::new(UrlKind::Pdf);
    json_walk::walk(&Value::Object(data.clone()), &mut pdfs);
    for url in pdfs.urls {
        if let Some(url) = url_utils::resolve(&url, base) {
            push_unique_ci(&mut candidate.manuals, url);
        }
    }

    candidate
}

/// A trimmed, non-empty string (first element for arrays).
fn single_string(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items
            .first()
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// Plain string, or the `name` of a nested object such as `{"@type":"Brand","name":"Acme"}`.
fn name_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Object(map) => single_string(map, "name"),
        Value::Array(items) => items.iter().find_map(name_of),
        _ => None,
    }
}

/// `"12 lb"`, `12`, or a `QuantitativeValue`/`PropertyValue` with `value` and
/// `unitText`/`unitCode`.
fn quantitative_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => {
            let amount = match map.get("value")? {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => if *b { "Yes".to_string() } else { "No".to_string() },
                _ => return None,
            };
            if amount.is_empty() {
                return None;
            }
            let unit = single_string(map, "unitText").or_else(|| {
                single_string(map, "unitCode").map(|code| unit_code_label(&code))
            });
            Some(match unit {
                Some(unit) if !unit.is_empty() => format!("{amount} {unit}"),
                _ => amount,
            })
        }
        _ => None,
    }
}

/// UN/CEFACT common codes used by schema.org `unitCode`.
fn unit_code_label(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "LBR" => "lb".to_string(),
        "KGM" => "kg".to_string(),
        "GRM" => "g".to_string(),
        "INH" => "in".to_string(),
        "CMT" => "cm".to_string(),
        "MMT" => "mm".to_string(),
        "FOT" => "ft".to_string(),
        "HM" => "mph".to_string(),
        _ => code.to_string(),
    }
}

/// Image URLs from a string, `ImageObject`, or array of either.
fn image_urls(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.trim().to_string()],
        Value::Object(map) => single_string(map, "url")
            .or_else(|| single_string(map, "contentUrl"))
            .into_iter()
            .collect(),
        Value::Array(items) => items.iter().flat_map(image_urls).collect(),
        _ => Vec::new(),
    }
}
