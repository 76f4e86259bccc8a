//! Content-rule validation of a finished record.
//!
//! Violations are plain messages prefixed with their area (`Name:`,
//! `Content:`, `Images:`, `Catalog:`). Nothing here mutates the record.

use std::collections::HashSet;

use crate::result::ProductRecord;
use crate::url_utils;

/// Rules a publishable record must satisfy.
#[derive(Debug, Clone)]
pub struct QaRules {
    /// Shortest acceptable name, in chars.
    ///
    /// Default: `3`
    pub name_min: usize,

    /// Longest acceptable name, in chars.
    ///
    /// Default: `255`
    pub name_max: usize,

    /// Shortest acceptable description, in chars.
    ///
    /// Default: `30`
    pub description_min: usize,

    /// Minimum number of images.
    ///
    /// Default: `1`
    pub min_images: usize,

    /// Phrases that must not appear in the description (case-insensitive).
    ///
    /// Default: empty
    pub banned_phrases: Vec<String>,

    /// Require a product code.
    ///
    /// Default: `false`
    pub require_sku: bool,
}

impl Default for QaRules {
    fn default() -> Self {
        Self {
            name_min: 3,
            name_max: 255,
            description_min: 30,
            min_images: 1,
            banned_phrases: Vec::new(),
            require_sku: false,
        }
    }
}

/// Every rule violation of `record`, in rule order.
#[must_use]
pub fn validate(record: &ProductRecord, rules: &QaRules) -> Vec<String> {
    let mut errors = Vec::new();

    let name_len = record.name.trim().chars().count();
    if name_len < rules.name_min {
        errors.push(format!("Name: shorter than {} chars", rules.name_min));
    } else if name_len > rules.name_max {
        errors.push(format!("Name: longer than {} chars", rules.name_max));
    }

    if record.description.trim().chars().count() < rules.description_min {
        errors.push(format!("Content: description shorter than {} chars", rules.description_min));
    }

    let description = record.description.to_lowercase();
    for phrase in &rules.banned_phrases {
        if !phrase.trim().is_empty() && description.contains(&phrase.to_lowercase()) {
            errors.push(format!("Content: banned phrase detected: {phrase}"));
        }
    }

    if record.images.len() < rules.min_images {
        errors.push(format!("Images: at least {} product image(s) required", rules.min_images));
    }
    let mut seen = HashSet::new();
    for image in &record.images {
        if !seen.insert(url_utils::normalize_url(&image.url)) {
            errors.push(format!("Images: duplicate image {}", image.url));
        }
    }

    if rules.require_sku && record.sku.as_deref().is_none_or(|s| s.trim().is_empty()) {
        errors.push("Catalog: product code missing".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ImageRef;

    fn record() -> ProductRecord {
        ProductRecord {
            name: "Folding Travel Scooter".into(),
            description: "A compact scooter that folds in seconds for travel.".into(),
            images: vec![ImageRef { url: "https://cdn.example.com/s1.jpg".into() }],
            sku: Some("MS-4".into()),
            ..ProductRecord::new("https://shop.example.com/p")
        }
    }

    #[test]
    fn test_clean_record_passes() {
        assert!(validate(&record(), &QaRules::default()).is_empty());
    }

    #[test]
    fn test_violations_are_reported() {
        let mut rec = record();
        rec.name = "X".into();
        rec.description = "Cures everything.".into();
        rec.images.clear();
        rec.sku = None;

        let rules = QaRules {
            banned_phrases: vec!["cures".into()],
            require_sku: true,
            ..QaRules::default()
        };
        let errors = validate(&rec, &rules);
        assert_eq!(errors.len(), 5);
        assert!(errors[0].starts_with("Name:"));
        assert!(errors.iter().any(|e| e == "Content: banned phrase detected: cures"));
        assert_eq!(errors.last().map(String::as_str), Some("Catalog: product code missing"));
    }

    #[test]
    fn test_duplicate_images() {
        let mut rec = record();
        rec.images.push(ImageRef { url: "https://cdn.example.com/s1.jpg".into() });
        let errors = validate(&rec, &QaRules::default());
        assert_eq!(errors, vec!["Images: duplicate image https://cdn.example.com/s1.jpg"]);
    }
}
