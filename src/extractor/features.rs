//! Feature extraction.
//!
//! Only explicitly feature-labelled containers and resolved Features panes
//! count. List items and sentences of the main region are a last resort used
//! when no such container exists, and they go through the same noise cleanup.

use dom_query::{Document, Selection};

use super::{in_chrome, main_region};
use crate::dom;
use crate::noise::NoiseFilter;
use crate::patterns::FEATURE_CLASS;
use crate::tabs::{MatchMode, PaneChain, Section};

const SENTENCE_MIN_CHARS: usize = 20;
const SENTENCE_MAX_CHARS: usize = 180;

/// Cleaned features of the whole page.
#[must_use]
pub fn extract_features(doc: &Document, filter: &NoiseFilter, panes: &PaneChain) -> Vec<String> {
    let mut lines = Vec::new();

    let containers = doc.select("div, section, ul, ol");
    for container in containers.iter() {
        if !FEATURE_CLASS.is_match(&dom::id_class(&container)) || in_chrome(&container) {
            continue;
        }
        lines.extend(features_in(&container));
    }
    for pane in panes.resolve(doc, Section::Features, MatchMode::Contains) {
        lines.extend(features_in(&pane.root));
    }

    let explicit = filter.clean_features(&lines);
    if !explicit.is_empty() {
        return explicit;
    }
    filter.clean_features(&fallback_lines(doc))
}

/// Feature lines of one container: its list items, or its visible lines when
/// it has no list.
#[must_use]
pub fn features_in(root: &Selection) -> Vec<String> {
    let items: Vec<String> = root
        .select("li")
        .iter()
        .filter(|li| !li.select("ul, ol").exists())
        .map(|li| dom::text(&li))
        .filter(|t| !t.is_empty())
        .collect();
    if items.is_empty() {
        dom::visible_lines(root)
    } else {
        items
    }
}

/// Main-region list items outside chrome and tables, else paragraph sentences.
fn fallback_lines(doc: &Document) -> Vec<String> {
    let main = main_region(doc);

    let items: Vec<String> = main
        .select("li")
        .iter()
        .filter(|li| !in_chrome(li) && !dom::has_ancestor_tag(li, &["table", "form", "select"]))
        .filter(|li| !li.select("ul, ol, a[href]").exists())
        .map(|li| dom::text(&li))
        .filter(|t| !t.is_empty())
        .collect();
    if !items.is_empty() {
        return items;
    }

    main.select("p")
        .iter()
        .filter(|p| !in_chrome(p))
        .flat_map(|p| split_sentences(&dom::text(&p)))
        .filter(|s| (SENTENCE_MIN_CHARS..=SENTENCE_MAX_CHARS).contains(&s.chars().count()))
        .collect()
}

/// Split text after `.`, `!` or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| n.is_whitespace()) {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabs;

    #[test]
    fn test_feature_container_only() {
        let doc = Document::from(
            r#"<main>
                <ul class="key-features"><li>Folds flat for travel</li><li>Add to Cart</li></ul>
                <ul><li>Some unrelated list item</li></ul>
            </main>"#,
        );
        let features = extract_features(&doc, &NoiseFilter::default(), tabs::default_chain());
        assert_eq!(features, vec!["Folds flat for travel"]);
    }

    #[test]
    fn test_fused_bullets_in_container() {
        let doc = Document::from(
            r#"<div class="product-highlights"><p>Powerful:</p><p>runs quietly.</p></div>"#,
        );
        let features = extract_features(&doc, &NoiseFilter::default(), tabs::default_chain());
        assert_eq!(features, vec!["Powerful: runs quietly."]);
    }

    #[test]
    fn test_list_item_fallback_skips_chrome() {
        let doc = Document::from(
            r#"<nav><ul><li>Home</li><li>Shop wheelchairs</li></ul></nav>
            <main><ul><li>Padded armrests</li><li>Swing-away footrests</li></ul></main>"#,
        );
        let features = extract_features(&doc, &NoiseFilter::default(), tabs::default_chain());
        assert_eq!(features, vec!["Padded armrests", "Swing-away footrests"]);
    }

    #[test]
    fn test_sentence_fallback() {
        let doc = Document::from(
            "<main><p>The seat is padded for comfort. Short. It folds in seconds for storage.</p></main>",
        );
        let features = extract_features(&doc, &NoiseFilter::default(), tabs::default_chain());
        assert_eq!(
            features,
            vec!["The seat is padded for comfort.", "It folds in seconds for storage."]
        );
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(split_sentences("One. Two! 3.5 mph"), vec!["One.", "Two!", "3.5 mph"]);
    }
}
