//! Storefront-specific pane shapes, consulted only when the generic resolver
//! finds nothing.

use dom_query::{Document, Selection};

use super::generic::{control_label, control_target};
use super::{MatchMode, PaneExtractor, PlatformSource, Section, TabPane};
use crate::dom;

/// WooCommerce product tabs: `.woocommerce-tabs` menu links to
/// `.woocommerce-Tabs-panel#tab-<key>` panels.
#[derive(Debug, Clone, Copy, Default)]
pub struct WooCommercePanes;

impl PaneExtractor for WooCommercePanes {
    fn platform(&self) -> PlatformSource {
        PlatformSource::WooCommerce
    }

    fn extract<'a>(&self, doc: &'a Document, section: Section, mode: MatchMode) -> Vec<TabPane<'a>> {
        if !doc.select(".woocommerce-tabs, .wc-tabs-wrapper").exists() {
            return Vec::new();
        }

        let mut panes = Vec::new();
        for link in doc.select(".woocommerce-tabs .tabs a, .wc-tabs a, .wc-tabs li").iter() {
            let label = control_label(&link);
            if !section.matches_label(&label, mode) {
                continue;
            }
            if let Some(target) = control_target(doc, &link) {
                panes.push(TabPane::new(label, target, PlatformSource::WooCommerce));
            }
        }
        if !panes.is_empty() {
            return panes;
        }

        // menu-less themes: the panel id carries the tab key
        for panel in doc.select(".woocommerce-Tabs-panel[id], .wc-tab[id]").iter() {
            let key = dom::attr(&panel, "id")
                .trim_start_matches("tab-")
                .replace(['_', '-'], " ");
            if section.matches_label(&key, mode) {
                panes.push(TabPane::new(key, panel, PlatformSource::WooCommerce));
            }
        }
        panes
    }
}

/// BigCommerce (Stencil) tabs: `a.tab-title[href="#tab-x"]` pointing at
/// `.tab-content#tab-x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BigCommercePanes;

impl PaneExtractor for BigCommercePanes {
    fn platform(&self) -> PlatformSource {
        PlatformSource::BigCommerce
    }

    fn extract<'a>(&self, doc: &'a Document, section: Section, mode: MatchMode) -> Vec<TabPane<'a>> {
        let mut panes = Vec::new();
        for title in doc.select(".tab-title, .productView-tab-title").iter() {
            let label = control_label(&title);
            if !section.matches_label(&label, mode) {
                continue;
            }
            let target = control_target(doc, &title).or_else(|| {
                // title wrapped in an anchor: <a href="#tab-x"><span class="tab-title">
                title
                    .parent()
                    .iter()
                    .find(|p| dom::is_one_of_tags(p, &["a"]))
                    .and_then(|a| control_target(doc, &a))
            });
            if let Some(target) = target.filter(|t| dom::attr(t, "class").contains("tab-content")) {
                panes.push(TabPane::new(label, target, PlatformSource::BigCommerce));
            }
        }
        panes
    }
}

/// Shopify (Online Store 2.0) collapsible rows: `<details><summary>` blocks
/// and `.collapsible-trigger` buttons followed by `.collapsible-content`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShopifyPanes;

impl PaneExtractor for ShopifyPanes {
    fn platform(&self) -> PlatformSource {
        PlatformSource::Shopify
    }

    fn extract<'a>(&self, doc: &'a Document, section: Section, mode: MatchMode) -> Vec<TabPane<'a>> {
        let mut panes = Vec::new();

        for details in doc.select("details").iter() {
            let summary = details.select("summary").first();
            let label = dom::text(&summary);
            if section.matches_label(&label, mode) {
                let content = details_content(&details);
                panes.push(TabPane::new(label, content, PlatformSource::Shopify));
            }
        }

        for trigger in doc
            .select(".collapsible-trigger, .collapsible-trigger-btn, .accordion__title, .product-tabs__title")
            .iter()
        {
            let label = control_label(&trigger);
            if !section.matches_label(&label, mode) {
                continue;
            }
            let target = control_target(doc, &trigger).or_else(|| dom::next_element_sibling(&trigger));
            if let Some(target) = target {
                panes.push(TabPane::new(label, target, PlatformSource::Shopify));
            }
        }
        panes
    }
}

/// The content wrapper of a `<details>` block, or the block itself.
fn details_content<'a>(details: &Selection<'a>) -> Selection<'a> {
    let wrapper = details.select(".accordion__content, .collapsible-content, .details-content").first();
    if wrapper.exists() {
        wrapper
    } else {
        details.clone()
    }
}
