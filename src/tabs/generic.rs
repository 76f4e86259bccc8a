//! Generic ARIA/Bootstrap tab, panel and accordion resolution.

use std::collections::HashSet;

use dom_query::{Document, NodeId, Selection};

use super::{MatchMode, PaneExtractor, PlatformSource, Section, TabPane};
use crate::dom;

/// Elements that toggle a pane.
const CONTROL_SELECTOR: &str = "[role='tab'], [data-toggle='tab'], [data-bs-toggle='tab'], \
    [data-toggle='collapse'], [data-bs-toggle='collapse'], [aria-controls], [data-target], \
    [data-bs-target], [data-tab], a[href^='#']";

/// Attributes linking a control to its pane, in precedence order.
const TARGET_ATTRS: &[&str] = &["aria-controls", "data-bs-target", "data-target", "data-tab", "href"];

/// Known pane containers.
const PANEL_SELECTOR: &str = "[role='tabpanel'], .tab-pane, .accordion-content, .accordion-body, \
    .accordion-collapse, .panel-collapse";

/// Heading-like elements inside or before a panel.
const HEADING_SELECTOR: &str =
    ".accordion-header, .accordion-title, .panel-title, .panel-heading, .tab-title, h2, h3, h4, h5, h6, summary";

const HEADING_MAX_CHARS: usize = 60;

/// Resolver for ARIA tabs, Bootstrap tabs/collapses and plain accordions.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericPanes;

impl PaneExtractor for GenericPanes {
    fn platform(&self) -> PlatformSource {
        PlatformSource::Generic
    }

    fn extract<'a>(&self, doc: &'a Document, section: Section, mode: MatchMode) -> Vec<TabPane<'a>> {
        let panes = controlled_panes(doc, section, mode);
        if !panes.is_empty() {
            return panes;
        }
        let panes = headed_panels(doc, section, mode);
        if !panes.is_empty() {
            return panes;
        }
        class_panels(doc, section)
    }
}

/// Visible label of a control.
pub(super) fn control_label(control: &Selection) -> String {
    let text = dom::text(control);
    if !text.is_empty() {
        return text;
    }
    let aria = dom::attr(control, "aria-label");
    if !aria.trim().is_empty() {
        return dom::normalize_ws(&aria);
    }
    dom::normalize_ws(&dom::attr(control, "title"))
}

/// Pane a control points at through `aria-controls`, a data target or an
/// `href` fragment. Only id references are followed.
pub(super) fn control_target<'a>(doc: &'a Document, control: &Selection) -> Option<Selection<'a>> {
    let own_id = dom::node_id(control);
    for name in TARGET_ATTRS {
        let value = dom::attr(control, name);
        let value = value.trim();
        if value.is_empty() || (*name == "href" && !value.starts_with('#')) {
            continue;
        }
        let id = value.trim_start_matches('#');
        if id.is_empty() || id.contains(char::is_whitespace) || id.starts_with('.') {
            continue;
        }
        if let Some(target) = dom::find_by_id(doc, id) {
            if dom::node_id(&target) != own_id {
                return Some(target);
            }
        }
    }
    None
}

/// (a) Controls whose label names the section, followed to their pane.
fn controlled_panes<'a>(doc: &'a Document, section: Section, mode: MatchMode) -> Vec<TabPane<'a>> {
    let mut panes = Vec::new();
    for control in doc.select(CONTROL_SELECTOR).iter() {
        let label = control_label(&control);
        if !section.matches_label(&label, mode) {
            continue;
        }
        if let Some(target) = control_target(doc, &control) {
            panes.push(TabPane::new(label, target, PlatformSource::Generic));
        }
    }
    panes
}

/// (b) Known panel containers matched by their own heading.
fn headed_panels<'a>(doc: &'a Document, section: Section, mode: MatchMode) -> Vec<TabPane<'a>> {
    let mut panes = Vec::new();
    for panel in doc.select(PANEL_SELECTOR).iter() {
        let Some(heading) = panel_heading(doc, &panel) else {
            continue;
        };
        if section.matches_label(&heading, mode) {
            panes.push(TabPane::new(heading, panel, PlatformSource::Generic));
        }
    }
    panes
}

/// Heading of a panel: `aria-labelledby`, then a heading inside it, then a
/// heading-like element just before it.
fn panel_heading(doc: &Document, panel: &Selection) -> Option<String> {
    let labelled_by = dom::attr(panel, "aria-labelledby");
    if let Some(label) = labelled_by
        .split_whitespace()
        .next()
        .and_then(|id| dom::find_by_id(doc, id))
        .map(|sel| dom::text(&sel))
        .filter(|t| !t.is_empty())
    {
        return Some(label);
    }

    let inner = panel.select(HEADING_SELECTOR).first();
    let inner_text = dom::text(&inner);
    if !inner_text.is_empty() && inner_text.chars().count() <= HEADING_MAX_CHARS {
        return Some(inner_text);
    }

    let previous = dom::previous_element_sibling(panel)?;
    let is_heading = dom::is_one_of_tags(&previous, &["h2", "h3", "h4", "h5", "h6", "button", "summary", "dt", "a"])
        || ["header", "heading", "title", "toggle", "trigger"]
            .iter()
            .any(|hint| dom::id_class(&previous).contains(hint));
    let text = dom::text(&previous);
    (is_heading && !text.is_empty() && text.chars().count() <= HEADING_MAX_CHARS).then_some(text)
}

/// (c) `div`/`section` elements whose id or class names the section. Only the
/// outermost match of a nested group is kept.
fn class_panels<'a>(doc: &'a Document, section: Section) -> Vec<TabPane<'a>> {
    let mut kept: HashSet<NodeId> = HashSet::new();
    let mut panes = Vec::new();

    for block in doc.select("div, section").iter() {
        let ic = dom::id_class(&block);
        if ic.trim().is_empty() || !section.matches_class(&ic) || crate::extractor::in_chrome(&block) {
            continue;
        }
        let Some(node) = block.nodes().first().copied() else {
            continue;
        };
        if node.ancestors(None).iter().any(|a| kept.contains(&a.id)) {
            continue;
        }
        kept.insert(node.id);
        panes.push(TabPane::new(section.label(), block, PlatformSource::Generic));
    }
    panes
}
