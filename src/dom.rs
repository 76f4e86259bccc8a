//! DOM Operations Adapter
//!
//! Thin helpers over the `dom_query` crate used by every extractor:
//! attribute access, normalized text, block-aware line splitting and
//! id lookups that tolerate arbitrary characters.

pub use dom_query::{Document, NodeRef, Selection};
pub use tendril::StrTendril;

use crate::patterns::WHITESPACE_NORMALIZE;

/// Tags that start a new line when flattening markup into text lines.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tbody", "thead", "tfoot", "tr", "ul",
];

/// Tags whose text is never visible.
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

// === Attribute Operations ===

/// Get any attribute value (empty string if missing).
#[inline]
#[must_use]
pub fn attr(sel: &Selection, name: &str) -> String {
    sel.attr(name).map(|s| s.to_string()).unwrap_or_default()
}

/// Get element ID attribute.
#[inline]
#[must_use]
pub fn id(sel: &Selection) -> Option<String> {
    sel.attr("id").map(|s| s.to_string())
}

/// Lowercased `id` and `class` joined with a space, for pattern checks.
#[must_use]
pub fn id_class(sel: &Selection) -> String {
    format!("{} {}", attr(sel, "id"), attr(sel, "class")).to_lowercase()
}

/// Get tag name (lowercase).
#[must_use]
pub fn tag_name(sel: &Selection) -> Option<String> {
    sel.nodes()
        .first()
        .and_then(dom_query::NodeRef::node_name)
        .map(|t| t.to_ascii_lowercase())
}

/// Check if element is one of the specified tags.
#[must_use]
pub fn is_one_of_tags(sel: &Selection, tags: &[&str]) -> bool {
    tag_name(sel).is_some_and(|t| tags.contains(&t.as_str()))
}

/// Outer HTML of the selection.
///
/// Returns `StrTendril` for zero-copy passing. Use `.to_string()` only when
/// you need owned storage.
#[inline]
#[must_use]
pub fn outer_html(sel: &Selection) -> StrTendril {
    sel.html()
}

// === Text Content ===

/// Collapse whitespace runs to single spaces and trim.
#[must_use]
pub fn normalize_ws(text: &str) -> String {
    WHITESPACE_NORMALIZE.replace_all(text, " ").trim().to_string()
}

/// Whitespace-normalized text content of a selection.
#[must_use]
pub fn text(sel: &Selection) -> String {
    normalize_ws(&sel.text())
}

/// Flatten markup into visible text lines, breaking at block elements and
/// skipping scripts/styles. Table cells on the same row are separated by a space.
#[must_use]
pub fn visible_lines(sel: &Selection) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buf = String::new();
    for node in sel.nodes() {
        walk_lines(node, &mut lines, &mut buf);
    }
    flush_line(&mut buf, &mut lines);
    lines
}

fn walk_lines(node: &NodeRef, lines: &mut Vec<String>, buf: &mut String) {
    for child in node.children() {
        if child.is_text() {
            buf.push_str(&child.text());
            continue;
        }
        if !child.is_element() {
            continue;
        }
        let name = child
            .node_name()
            .map(|n| n.to_ascii_lowercase())
            .unwrap_or_default();
        if INVISIBLE_TAGS.contains(&name.as_str()) {
            continue;
        }
        let block = BLOCK_TAGS.contains(&name.as_str());
        if block {
            flush_line(buf, lines);
        } else if matches!(name.as_str(), "td" | "th") && !buf.trim().is_empty() {
            buf.push(' ');
        }
        walk_lines(&child, lines, buf);
        if block {
            flush_line(buf, lines);
        }
    }
}

fn flush_line(buf: &mut String, lines: &mut Vec<String>) {
    let line = normalize_ws(buf);
    if !line.is_empty() {
        lines.push(line);
    }
    buf.clear();
}

// === Tree Navigation ===

/// Next sibling that is an element, skipping text nodes.
#[must_use]
pub fn next_element_sibling<'a>(sel: &Selection<'a>) -> Option<Selection<'a>> {
    sel.nodes().first().and_then(|node| {
        let mut sibling = node.next_sibling();
        while let Some(s) = sibling {
            if s.is_element() {
                return Some(Selection::from(s));
            }
            sibling = s.next_sibling();
        }
        None
    })
}

/// Previous sibling that is an element, skipping text nodes.
#[must_use]
pub fn previous_element_sibling<'a>(sel: &Selection<'a>) -> Option<Selection<'a>> {
    sel.nodes().first().and_then(|node| {
        let mut sibling = node.prev_sibling();
        while let Some(s) = sibling {
            if s.is_element() {
                return Some(Selection::from(s));
            }
            sibling = s.prev_sibling();
        }
        None
    })
}

/// Node id of the first node, for identity comparisons.
#[must_use]
pub fn node_id(sel: &Selection) -> Option<dom_query::NodeId> {
    sel.nodes().first().map(|n| n.id)
}

// === Querying ===

/// Find an element by id without building a CSS selector from untrusted text.
#[must_use]
pub fn find_by_id<'a>(doc: &'a Document, wanted: &str) -> Option<Selection<'a>> {
    let wanted = wanted.trim().trim_start_matches('#');
    if wanted.is_empty() {
        return None;
    }
    doc.select("[id]")
        .iter()
        .find(|sel| sel.attr("id").is_some_and(|v| &*v == wanted))
}

/// Whether any ancestor of the selection is one of `tags`.
#[must_use]
pub fn has_ancestor_tag(sel: &Selection, tags: &[&str]) -> bool {
    let Some(node) = sel.nodes().first() else {
        return false;
    };
    node.ancestors(None).iter().any(|anc| {
        anc.node_name()
            .is_some_and(|n| tags.contains(&n.to_ascii_lowercase().as_str()))
    })
}

/// Lowercased id/class of every ancestor, nearest first.
#[must_use]
pub fn ancestor_id_classes(sel: &Selection, max_depth: usize) -> Vec<String> {
    let Some(node) = sel.nodes().first() else {
        return Vec::new();
    };
    node.ancestors(Some(max_depth))
        .into_iter()
        .filter(NodeRef::is_element)
        .map(|anc| id_class(&Selection::from(anc)))
        .collect()
}

// === Parsing ===

/// Parse HTML string into document.
#[inline]
#[must_use]
pub fn parse(html: &str) -> Document {
    Document::from(html)
}

/// Parse a fragment and return the document; select `body` to scope extractors.
#[must_use]
pub fn parse_fragment(html: &str) -> Document {
    Document::from(format!("<html><body>{html}</body></html>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_and_id_class() {
        let doc = parse(r#"<div id="Main" class="Product-Gallery">x</div>"#);
        let div = doc.select("div");

        assert_eq!(attr(&div, "class"), "Product-Gallery");
        assert_eq!(attr(&div, "missing"), "");
        assert_eq!(id_class(&div), "main product-gallery");
        assert_eq!(tag_name(&div).as_deref(), Some("div"));
    }

    #[test]
    fn test_visible_lines_breaks_blocks_and_skips_scripts() {
        let doc = parse(
            r#"<div id="c"><h2>Overview</h2><p>First   line</p>
            <script>var x = 1;</script>
            <ul><li>One</li><li>Two <b>bold</b></li></ul>
            <table><tr><td>Weight</td><td>12 lb</td></tr></table></div>"#,
        );
        let lines = visible_lines(&doc.select("#c"));
        assert_eq!(lines, vec!["Overview", "First line", "One", "Two bold", "Weight 12 lb"]);
    }

    #[test]
    fn test_find_by_id_handles_odd_ids() {
        let doc = parse(r#"<div id="tab:specs.1">A</div><div id="other">B</div>"#);
        let found = find_by_id(&doc, "#tab:specs.1");
        assert_eq!(found.map(|s| text(&s)).as_deref(), Some("A"));
        assert!(find_by_id(&doc, "").is_none());
    }

    #[test]
    fn test_has_ancestor_tag() {
        let doc = parse("<nav><ul><li><a href='/x'>x</a></li></ul></nav><p><a href='/y'>y</a></p>");
        let links: Vec<_> = doc.select("a").iter().collect();
        assert!(has_ancestor_tag(&links[0], &["nav", "footer"]));
        assert!(!has_ancestor_tag(&links[1], &["nav", "footer"]));
    }
}
