//! RDFa (`typeof` / `property`) product parsing.

use dom_query::{Document, NodeRef, Selection};
use url::Url;

use super::{apply_property, is_product_type, StructuredError, StructuredSource};
use crate::dom;
use crate::result::{Candidate, Provenance};

/// RDFa structured-data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct RdfaSource;

impl StructuredSource for RdfaSource {
    fn provenance(&self) -> Provenance {
        Provenance::Rdfa
    }

    fn extract(&self, doc: &Document, base: Option<&Url>) -> Result<Candidate, StructuredError> {
        let mut candidate = Candidate::new(Provenance::Rdfa);
        let mut product_scopes = 0;

        for scope in doc.select("[typeof]").iter() {
            if !is_product_type(&dom::attr(&scope, "typeof")) {
                continue;
            }
            let Some(scope_node) = scope.nodes().first().copied() else {
                continue;
            };
            product_scopes += 1;

            for prop in scope.select("[property]").iter() {
                let Some(node) = prop.nodes().first().copied() else {
                    continue;
                };
                if nearest_typed(&node).is_none_or(|owner| owner.id != scope_node.id) {
                    // property of a nested resource (brand, offer)
                    if let Some(brand) = nested_brand(&prop, &node, &scope_node) {
                        apply_property(&mut candidate, "brand", &brand, base);
                    }
                    continue;
                }
                let value = property_value(&prop);
                for property in dom::attr(&prop, "property").split_whitespace() {
                    if prop.has_attr("typeof") {
                        continue;
                    }
                    apply_property(&mut candidate, local_name(property), &value, base);
                }
            }
        }

        if product_scopes > 0 && candidate.is_empty() {
            return Err(StructuredError::Markup(format!(
                "{product_scopes} product resource(s) without readable properties"
            )));
        }
        Ok(candidate)
    }
}

/// `schema:name`, `http://schema.org/name` and `name` all become `name`.
fn local_name(property: &str) -> &str {
    property.rsplit(['/', ':', '#']).next().unwrap_or(property)
}

/// Nearest ancestor carrying `typeof`.
fn nearest_typed<'a>(node: &NodeRef<'a>) -> Option<NodeRef<'a>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.is_element() && parent.has_attr("typeof") {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

/// `name` inside a `property="brand" typeof="Brand"` resource owned by the product.
fn nested_brand(prop: &Selection, node: &NodeRef, product: &NodeRef) -> Option<String> {
    if local_name(&dom::attr(prop, "property")) != "name" {
        return None;
    }
    let owner = nearest_typed(node)?;
    let owner_sel = Selection::from(owner);
    let owner_props = dom::attr(&owner_sel, "property");
    let is_brand = owner_props
        .split_whitespace()
        .any(|p| matches!(local_name(p), "brand" | "manufacturer"));
    let owned_by_product = nearest_typed(&owner).is_some_and(|o| o.id == product.id);
    (is_brand && owned_by_product).then(|| property_value(prop))
}

/// RDFa value: `content`, then link-like attributes, then text.
fn property_value(prop: &Selection) -> String {
    if let Some(content) = prop.attr("content") {
        return content.to_string();
    }
    for attr_name in ["resource", "href", "src"] {
        if let Some(value) = prop.attr(attr_name) {
            return value.to_string();
        }
    }
    dom::text(prop)
}
