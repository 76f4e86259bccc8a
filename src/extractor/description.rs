//! Description extraction.
//!
//! Candidate containers (description-like class names, `itemprop=description`,
//! tab and accordion panels) are scored by the visible text length of their
//! headings and paragraphs. The longest wins. Without any candidate, the
//! longest paragraph of the main region is used.

use dom_query::{Document, Selection};

use super::{in_chrome, main_region};
use crate::dom;
use crate::patterns::DESCRIPTION_CLASS;

/// Elements whose text makes up a description.
const TEXT_SELECTOR: &str = "h2, h3, h4, h5, h6, p";

/// Panel containers considered as description candidates.
const PANEL_SELECTOR: &str =
    "[itemprop='description'], [role='tabpanel'], .tab-pane, .accordion-content, .accordion-body";

/// Shortest paragraph accepted by the fallback.
const MIN_PARAGRAPH_CHARS: usize = 40;

/// Description of the whole page.
#[must_use]
pub fn extract_description(doc: &Document) -> Option<String> {
    let mut best: Option<(usize, Vec<String>)> = None;

    let blocks = doc.select("div, section, article");
    let panels = doc.select(PANEL_SELECTOR);
    let containers = blocks
        .iter()
        .filter(|sel| {
            let ic = dom::id_class(sel);
            ic.trim().len() > 1 && DESCRIPTION_CLASS.is_match(&ic)
        })
        .chain(panels.iter());

    for container in containers {
        if in_chrome(&container) {
            continue;
        }
        let lines = container_lines(&container);
        let score = score(&lines);
        if score > 0 && best.as_ref().is_none_or(|(s, _)| score > *s) {
            best = Some((score, lines));
        }
    }

    if let Some((_, lines)) = best {
        return Some(lines.join("\n"));
    }
    longest_paragraph(doc)
}

/// Description of a single container (a harvested pane).
#[must_use]
pub fn description_in(root: &Selection) -> Option<String> {
    let lines = container_lines(root);
    (score(&lines) > 0).then(|| lines.join("\n"))
}

/// Heading and paragraph lines of a container, or all its visible lines when
/// it has no such elements.
fn container_lines(container: &Selection) -> Vec<String> {
    let lines: Vec<String> = container
        .select(TEXT_SELECTOR)
        .iter()
        .map(|el| dom::text(&el))
        .filter(|t| !t.is_empty())
        .collect();
    if lines.is_empty() {
        dom::visible_lines(container)
    } else {
        lines
    }
}

fn score(lines: &[String]) -> usize {
    lines.iter().map(|l| l.chars().count()).sum()
}

fn longest_paragraph(doc: &Document) -> Option<String> {
    main_region(doc)
        .select("p")
        .iter()
        .filter(|p| !in_chrome(p))
        .map(|p| dom::text(&p))
        .filter(|t| t.chars().count() >= MIN_PARAGRAPH_CHARS)
        .max_by_key(|t| t.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_container_wins() {
        let doc = Document::from(
            r#"<div class="short-description"><p>Short blurb.</p></div>
            <div id="product-description">
                <h3>About</h3>
                <p>This rollator has a padded seat and a storage bag.</p>
                <p>The frame folds in one motion.</p>
            </div>"#,
        );
        let description = extract_description(&doc);
        assert_eq!(
            description.as_deref(),
            Some("About\nThis rollator has a padded seat and a storage bag.\nThe frame folds in one motion.")
        );
    }

    #[test]
    fn test_chrome_container_is_ignored() {
        let doc = Document::from(
            r#"<footer><div class="description"><p>Store description that is very long and would otherwise win easily.</p></div></footer>
            <div class="description"><p>Product text.</p></div>"#,
        );
        assert_eq!(extract_description(&doc).as_deref(), Some("Product text."));
    }

    #[test]
    fn test_paragraph_fallback() {
        let doc = Document::from(
            r#"<main><p>Tiny.</p><p>The longest paragraph under main is used as the description.</p></main>"#,
        );
        assert_eq!(
            extract_description(&doc).as_deref(),
            Some("The longest paragraph under main is used as the description.")
        );
    }

    #[test]
    fn test_empty_page_has_no_description() {
        let doc = Document::from("<html><body></body></html>");
        assert!(extract_description(&doc).is_none());
    }

    #[test]
    fn test_description_in_pane_without_paragraphs() {
        let doc = dom::parse_fragment("<div id='pane'>Line one<br>Line two</div>");
        assert_eq!(description_in(&doc.select("#pane")).as_deref(), Some("Line one\nLine two"));
    }
}
