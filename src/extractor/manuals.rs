//! Manual (PDF) link discovery.
//!
//! Anchors pointing at PDFs are read from document-like containers first and
//! from the whole page only when those hold no wanted document. PDF strings
//! inside inline scripts are mined through the JSON visitor. Only documents
//! named like a manual are kept; certificates and compliance-only documents
//! are dropped unless they are explicitly a manual too. Links mentioning the
//! product code or name rank first.

use std::collections::HashSet;

use dom_query::{Document, Selection};

use super::{in_chrome, ExtractContext};
use crate::dom;
use crate::json_walk::{self, UrlKind};
use crate::patterns::DOCUMENT_CONTAINER_CLASS;
use crate::url_utils;

/// Terms of documents worth reading.
const ALLOW_TERMS: &[&str] = &[
    "manual", "ifu", "instruction", "install", "assembly", "datasheet", "data sheet", "data-sheet",
    "spec sheet", "spec-sheet", "specsheet", "brochure", "guide", "owner", "user", "operating",
];

/// Allow terms that outweigh a block term.
const MANUAL_TERMS: &[&str] = &["manual", "ifu", "instruction"];

/// Terms of documents that never describe the product.
const BLOCK_TERMS: &[&str] = &[
    "certificate", "certification", "compliance", "conformity", "declaration", "warranty",
    "msds", "sds", "safety data", "recall", "return form", "returns", "privacy", "terms",
    "credit application", "price list", "pricelist",
];

/// A PDF link and the text it was found with.
#[derive(Debug, Clone)]
struct ManualLink {
    url: String,
    text: String,
}

/// Ranked manual URLs of the whole page.
#[must_use]
pub fn extract_manuals(doc: &Document, ctx: &ExtractContext<'_>) -> Vec<String> {
    let mut links = Vec::new();

    let containers = doc.select("div, section, article, ul, aside");
    for container in containers.iter() {
        let ic = dom::id_class(&container);
        if ic.trim().is_empty() || !DOCUMENT_CONTAINER_CLASS.is_match(&ic) || in_chrome(&container) {
            continue;
        }
        links.extend(anchor_links(&container, ctx));
    }
    links.retain(is_wanted);
    if links.is_empty() {
        links = anchor_links(&doc.select("body"), ctx);
    }

    for script in doc.select("script").iter() {
        if !dom::attr(&script, "src").is_empty() {
            continue;
        }
        for url in json_walk::collect_urls(&script.text(), UrlKind::Pdf) {
            if let Some(url) = url_utils::resolve(&url, ctx.base.as_ref()) {
                links.push(ManualLink { url, text: String::new() });
            }
        }
    }

    rank(links, ctx)
}

/// Ranked manual URLs inside one container.
#[must_use]
pub fn manuals_in(root: &Selection, ctx: &ExtractContext<'_>) -> Vec<String> {
    rank(anchor_links(root, ctx), ctx)
}

fn anchor_links(root: &Selection, ctx: &ExtractContext<'_>) -> Vec<ManualLink> {
    root.select("a[href]")
        .iter()
        .filter(|a| !in_chrome(a))
        .filter_map(|a| {
            let url = url_utils::resolve(&dom::attr(&a, "href"), ctx.base.as_ref())?;
            url_utils::is_pdf_url(&url).then(|| ManualLink {
                url,
                text: format!("{} {}", dom::text(&a), dom::attr(&a, "title")),
            })
        })
        .collect()
}

fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| haystack.contains(t))
}

/// Whether a document is kept: an allow term must match, and a block term
/// rejects it unless it is explicitly a manual.
fn is_wanted(link: &ManualLink) -> bool {
    let haystack = format!("{} {}", url_utils::extract_filename(&link.url), link.text).to_lowercase();
    if !contains_any(&haystack, ALLOW_TERMS) {
        return false;
    }
    !contains_any(&haystack, BLOCK_TERMS) || contains_any(&haystack, MANUAL_TERMS)
}

fn relevance(link: &ManualLink, ctx: &ExtractContext<'_>, name_tokens: &[String]) -> usize {
    let haystack = format!("{} {}", link.url, link.text).to_lowercase();
    let mut score = 0;
    if ctx.sku_token().is_some_and(|code| haystack.contains(&code)) {
        score += 2;
    }
    score += name_tokens.iter().filter(|t| haystack.contains(t.as_str())).count();
    if contains_any(&haystack, ALLOW_TERMS) {
        score += 1;
    }
    score
}

fn rank(links: Vec<ManualLink>, ctx: &ExtractContext<'_>) -> Vec<String> {
    let name_tokens = ctx.name_tokens();
    let mut seen = HashSet::new();
    let mut kept: Vec<(usize, ManualLink)> = links
        .into_iter()
        .filter(is_wanted)
        .filter(|l| seen.insert(url_utils::normalize_url(&l.url)))
        .map(|l| (relevance(&l, ctx, &name_tokens), l))
        .collect();

    kept.sort_by(|a, b| b.0.cmp(&a.0));
    kept.into_iter()
        .take(ctx.options.max_manuals)
        .map(|(_, l)| l.url)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::NoiseFilter;
    use crate::Options;
    use url::Url;

    fn run(html: &str) -> Vec<String> {
        let doc = Document::from(html);
        let options = Options::default();
        let filter = NoiseFilter::default();
        let ctx = ExtractContext::new(Url::parse("https://shop.example.com/p/scooter").ok(), &options, &filter)
            .with_hints(Some("Mobility Scooter".into()), Some("MS-4".into()));
        extract_manuals(&doc, &ctx)
    }

    #[test]
    fn test_container_links_are_ranked() {
        let manuals = run(
            r#"<div class="product-downloads">
                <a href="/docs/general-guide.pdf">Guide</a>
                <a href="/docs/ms-4-owners-manual.pdf">Owner's Manual</a>
                <a href="/docs/iso-certificate.pdf">ISO Certificate</a>
            </div>
            <a href="/docs/unrelated.pdf">Unrelated</a>"#,
        );
        assert_eq!(
            manuals,
            vec![
                "https://shop.example.com/docs/ms-4-owners-manual.pdf",
                "https://shop.example.com/docs/general-guide.pdf",
            ]
        );
    }

    #[test]
    fn test_whole_document_fallback() {
        let manuals = run(r#"<p><a href="/files/scooter-manual.pdf?v=2">Manual</a></p>"#);
        assert_eq!(manuals, vec!["https://shop.example.com/files/scooter-manual.pdf?v=2"]);
    }

    #[test]
    fn test_script_pdfs_are_mined() {
        let manuals = run(
            r#"<script>{"product":{"docs":[{"url":"https:\/\/cdn.example.com\/ms-4-ifu.pdf"}]}}</script>"#,
        );
        assert_eq!(manuals, vec!["https://cdn.example.com/ms-4-ifu.pdf"]);
    }

    #[test]
    fn test_warranty_only_is_dropped_but_warranty_manual_is_kept() {
        let manuals = run(
            r#"<div class="resources">
                <a href="/w/warranty.pdf">Warranty</a>
                <a href="/w/warranty-and-user-manual.pdf">Warranty and user manual</a>
            </div>"#,
        );
        assert_eq!(manuals, vec!["https://shop.example.com/w/warranty-and-user-manual.pdf"]);
    }

    #[test]
    fn test_documents_without_manual_terms_are_dropped() {
        let manuals = run(
            r#"<div class="product-downloads">
                <a href="/docs/press-release.pdf">Press release</a>
                <a href="/docs/ms-4-brochure.pdf">Brochure</a>
                <a href="/docs/user-guide-warranty.pdf">User guide and warranty</a>
            </div>"#,
        );
        assert_eq!(manuals, vec!["https://shop.example.com/docs/ms-4-brochure.pdf"]);
    }

    #[test]
    fn test_fallback_runs_when_containers_hold_only_unwanted_documents() {
        let manuals = run(
            r#"<div class="product-downloads">
                <a href="/docs/ce-declaration.pdf">CE Declaration of Conformity</a>
            </div>
            <p><a href="/docs/ms-4-owners-manual.pdf">Owner's Manual</a></p>"#,
        );
        assert_eq!(manuals, vec!["https://shop.example.com/docs/ms-4-owners-manual.pdf"]);
    }
}
