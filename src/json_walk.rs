//! Visitor over embedded JSON payloads.
//!
//! Product pages bury image galleries, manual links and attribute tables in
//! arbitrary script payloads. Instead of probing properties dynamically, the
//! payload is parsed into a `serde_json::Value` and walked depth-first in
//! document order; visitors receive every string leaf and every scalar
//! object member. JSON is a tree, so the walk is bounded by input size.

use serde_json::Value;

use crate::patterns::{IMAGE_URL_IN_TEXT, PDF_URL_IN_TEXT};

/// Receives callbacks while a JSON value is walked.
pub trait JsonVisitor {
    /// Called for every string leaf, with the nearest object key (if any).
    fn visit_str(&mut self, _key: Option<&str>, _value: &str) {}

    /// Called for every object member whose value is a string, number or bool.
    fn visit_scalar_member(&mut self, _key: &str, _value: &Value) {}
}

/// Walk `value` depth-first in document order.
pub fn walk<V: JsonVisitor + ?Sized>(value: &Value, visitor: &mut V) {
    walk_inner(value, None, visitor);
}

fn walk_inner<V: JsonVisitor + ?Sized>(value: &Value, key: Option<&str>, visitor: &mut V) {
    match value {
        Value::String(s) => visitor.visit_str(key, s),
        Value::Array(items) => {
            for item in items {
                walk_inner(item, key, visitor);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                if matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
                    visitor.visit_scalar_member(k, v);
                }
                walk_inner(v, Some(k), visitor);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Parse a script body as JSON, tolerating HTML comment wrappers and a trailing `;`.
#[must_use]
pub fn parse_script_json(body: &str) -> Option<Value> {
    let trimmed = body
        .trim()
        .trim_start_matches("<!--")
        .trim_end_matches("-->")
        .trim()
        .trim_end_matches(';')
        .trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Kind of URL a [`UrlCollector`] looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// jpg/jpeg/png/webp/avif.
    Image,
    /// `.pdf` documents.
    Pdf,
}

/// Collects image or PDF URLs from string leaves, in first-seen order.
#[derive(Debug)]
pub struct UrlCollector {
    kind: UrlKind,
    /// URLs found so far (deduplicated, raw, possibly protocol-relative).
    pub urls: Vec<String>,
}

impl UrlCollector {
    /// Empty collector for `kind`.
    #[must_use]
    pub fn new(kind: UrlKind) -> Self {
        Self { kind, urls: Vec::new() }
    }

    fn push(&mut self, url: &str) {
        let url = url.replace("\\/", "/");
        if !self.urls.iter().any(|u| u == &url) {
            self.urls.push(url);
        }
    }

    /// Scan raw text (used for script bodies that are not pure JSON).
    pub fn scan_text(&mut self, text: &str) {
        let text = text.replace("\\/", "/");
        let pattern = match self.kind {
            UrlKind::Image => &*IMAGE_URL_IN_TEXT,
            UrlKind::Pdf => &*PDF_URL_IN_TEXT,
        };
        for m in pattern.find_iter(&text) {
            self.push(m.as_str());
        }
    }
}

impl JsonVisitor for UrlCollector {
    fn visit_str(&mut self, _key: Option<&str>, value: &str) {
        let lower = value.to_ascii_lowercase();
        let path_part = lower.split(['?', '#']).next().unwrap_or("");
        let wanted = match self.kind {
            UrlKind::Image => [".jpg", ".jpeg", ".png", ".webp", ".avif"]
                .iter()
                .any(|ext| path_part.ends_with(ext)),
            UrlKind::Pdf => path_part.ends_with(".pdf"),
        };
        if wanted && !value.contains(char::is_whitespace) {
            self.push(value.trim());
        }
    }
}

/// Collect URLs of `kind` from a script body: JSON walk when it parses,
/// regex scan otherwise.
#[must_use]
pub fn collect_urls(script_body: &str, kind: UrlKind) -> Vec<String> {
    let mut collector = UrlCollector::new(kind);
    match parse_script_json(script_body) {
        Some(value) => walk(&value, &mut collector),
        None => collector.scan_text(script_body),
    }
    collector.urls
}
