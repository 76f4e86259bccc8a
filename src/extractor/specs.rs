//! Specification extraction.
//!
//! A four-step chain, each step tried only when the previous one produced
//! nothing after cleaning:
//!
//! 1. the resolved "Specifications" tab pane
//! 2. the densest spec-like block (table rows, `dt`/`dd` pairs, `key: value` items)
//! 3. a global table, definition-list and list-item scan
//! 4. `key: value` mining over paragraph lines of the main region

use std::collections::BTreeMap;

use dom_query::{Document, NodeRef, Selection};

use super::{in_chrome, main_region};
use crate::dom;
use crate::noise::NoiseFilter;
use crate::patterns::{KEY_VALUE_LINE, SPEC_CLASS};
use crate::tabs::{MatchMode, PaneChain, Section};

/// Raw label/value pairs before cleaning. The first value per label wins.
pub type RawSpecs = BTreeMap<String, String>;

/// Specs of the whole page.
#[must_use]
pub fn extract_specs(doc: &Document, filter: &NoiseFilter, panes: &PaneChain) -> BTreeMap<String, String> {
    if let Some(pane) = panes.resolve(doc, Section::Specifications, MatchMode::Exact).into_iter().next() {
        let found = specs_in(&pane.root, filter);
        if !found.is_empty() {
            return found;
        }
    }

    if let Some(block) = densest_block(doc) {
        let found = filter.clean_specs(&specs_from_container(&block, false));
        if !found.is_empty() {
            return found;
        }
    }

    let found = filter.clean_specs(&specs_from_container(&doc.select("body"), true));
    if !found.is_empty() {
        return found;
    }

    filter.clean_specs(&mine_lines(&dom::visible_lines(&main_region(doc))))
}

/// Cleaned specs of one container, with line mining as a fallback.
#[must_use]
pub fn specs_in(root: &Selection, filter: &NoiseFilter) -> BTreeMap<String, String> {
    let found = filter.clean_specs(&specs_from_container(root, false));
    if !found.is_empty() {
        return found;
    }
    filter.clean_specs(&mine_lines(&dom::visible_lines(root)))
}

/// Two-cell table rows, definition-list pairs and `key: value` list items.
#[must_use]
pub fn specs_from_container(root: &Selection, skip_chrome: bool) -> RawSpecs {
    let mut specs = RawSpecs::new();

    for row in root.select("tr").iter() {
        if skip_chrome && in_chrome(&row) {
            continue;
        }
        if let Some((key, value)) = row_pair(&row) {
            insert_raw(&mut specs, key, value);
        }
    }

    for dl in root.select("dl").iter() {
        if skip_chrome && in_chrome(&dl) {
            continue;
        }
        for (key, value) in dl_pairs(&dl) {
            insert_raw(&mut specs, key, value);
        }
    }

    for li in root.select("li").iter() {
        if li.select("ul, ol").exists() || (skip_chrome && in_chrome(&li)) {
            continue;
        }
        if let Some((key, value)) = key_value(&dom::text(&li)) {
            insert_raw(&mut specs, key, value);
        }
    }

    specs
}

/// Number of spec-shaped entries a container holds.
#[must_use]
pub fn score_container(container: &Selection) -> usize {
    let rows = container.select("tr").iter().filter(|r| row_pair(r).is_some()).count();
    let pairs: usize = container.select("dl").iter().map(|dl| dl_pairs(&dl).len()).sum();
    let items = container
        .select("li")
        .iter()
        .filter(|li| key_value(&dom::text(li)).is_some())
        .count();
    rows + pairs + items
}

/// The highest-scoring spec-like container outside page chrome.
fn densest_block(doc: &Document) -> Option<Selection<'_>> {
    let labelled = doc.select("div, section, ul, table, dl");
    let bare = doc.select("table, dl");

    let mut best: Option<(usize, Selection<'_>)> = None;
    let candidates = labelled
        .iter()
        .filter(|sel| SPEC_CLASS.is_match(&dom::id_class(sel)))
        .chain(bare.iter());

    for candidate in candidates {
        if in_chrome(&candidate) {
            continue;
        }
        let score = score_container(&candidate);
        if score > 0 && best.as_ref().is_none_or(|(s, _)| score > *s) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, sel)| sel)
}

fn row_pair(row: &Selection) -> Option<(String, String)> {
    let cells: Vec<String> = row.select("th, td").iter().map(|c| dom::text(&c)).collect();
    match cells.as_slice() {
        [key, value] if !key.is_empty() && !value.is_empty() => {
            Some((key.trim_end_matches(':').trim().to_string(), value.clone()))
        }
        _ => None,
    }
}

/// `dt`/`dd` pairs of a definition list, in order.
fn dl_pairs(dl: &Selection) -> Vec<(String, String)> {
    let Some(node) = dl.nodes().first() else {
        return Vec::new();
    };
    let mut pairs = Vec::new();
    let mut pending: Option<String> = None;

    for child in node.children().into_iter().filter(NodeRef::is_element) {
        let name = child.node_name().map(|n| n.to_ascii_lowercase()).unwrap_or_default();
        let text = dom::normalize_ws(&child.text());
        match name.as_str() {
            "dt" => pending = Some(text),
            "dd" => {
                if let Some(key) = pending.take() {
                    if !key.is_empty() && !text.is_empty() {
                        pairs.push((key.trim_end_matches(':').trim().to_string(), text));
                    }
                }
            }
            _ => {}
        }
    }
    pairs
}

fn key_value(line: &str) -> Option<(String, String)> {
    let caps = KEY_VALUE_LINE.captures(line)?;
    let key = caps.get(1)?.as_str().trim().to_string();
    let value = caps.get(2)?.as_str().trim().to_string();
    (!key.is_empty() && !value.is_empty()).then_some((key, value))
}

/// `key: value` pairs found among free text lines.
#[must_use]
pub fn mine_lines<S: AsRef<str>>(lines: &[S]) -> RawSpecs {
    let mut specs = RawSpecs::new();
    for line in lines {
        if let Some((key, value)) = key_value(line.as_ref()) {
            insert_raw(&mut specs, key, value);
        }
    }
    specs
}

fn insert_raw(specs: &mut RawSpecs, key: String, value: String) {
    specs.entry(key).or_insert(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabs;

    #[test]
    fn test_container_shapes() {
        let doc = dom::parse_fragment(
            r#"<div id="s">
                <table><tr><th>Weight</th><td>12 lb</td></tr><tr><td>a</td><td>b</td><td>c</td></tr></table>
                <dl><dt>Color:</dt><dd>Blue</dd><dt>Orphan</dt></dl>
                <ul><li>Top Speed: 4.25 mph</li><li>Folds flat</li></ul>
            </div>"#,
        );
        let specs = specs_from_container(&doc.select("#s"), false);

        assert_eq!(specs.get("Weight").map(String::as_str), Some("12 lb"));
        assert_eq!(specs.get("Color").map(String::as_str), Some("Blue"));
        assert_eq!(specs.get("Top Speed").map(String::as_str), Some("4.25 mph"));
        assert_eq!(specs.len(), 3);
        assert_eq!(score_container(&doc.select("#s")), 3);
    }

    #[test]
    fn test_densest_block_beats_sparse_table() {
        let doc = Document::from(
            r#"<table class="shipping"><tr><td>Ships</td><td>Free shipping</td></tr></table>
            <div class="product-specs"><table>
                <tr><td>Weight Capacity</td><td>300 lbs</td></tr>
                <tr><td>Seat Height</td><td>20 inches</td></tr>
            </table></div>"#,
        );
        let specs = extract_specs(&doc, &NoiseFilter::default(), tabs::default_chain());
        assert_eq!(specs.get("weight_capacity").map(String::as_str), Some("300 lb"));
        assert_eq!(specs.get("seat_height").map(String::as_str), Some("20 in"));
        assert!(!specs.contains_key("ships"));
    }

    #[test]
    fn test_specifications_tab_is_first() {
        let doc = Document::from(
            r##"<ul class="nav-tabs" role="tablist">
                <li><a href="#tab-spec" role="tab">Specifications</a></li>
            </ul>
            <div id="tab-spec" class="tab-pane"><table><tr><td>Weight</td><td>15 lb</td></tr></table></div>
            <table class="other"><tr><td>Weight</td><td>99 lb</td></tr><tr><td>Width</td><td>20 in</td></tr></table>"##,
        );
        let specs = extract_specs(&doc, &NoiseFilter::default(), tabs::default_chain());
        assert_eq!(specs.get("weight").map(String::as_str), Some("15 lb"));
        assert!(!specs.contains_key("width"));
    }

    #[test]
    fn test_paragraph_mining_is_last_resort() {
        let doc = Document::from(
            "<main><p>Top Speed: 4.25 mph</p><p>Range: 15 miles per charge</p><p>Enjoy the ride.</p></main>",
        );
        let specs = extract_specs(&doc, &NoiseFilter::default(), tabs::default_chain());
        assert_eq!(specs.get("top_speed").map(String::as_str), Some("4.25 mph"));
        assert!(specs.contains_key("range"));
    }
}
