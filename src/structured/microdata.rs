//! Microdata (`itemscope` / `itemprop`) product parsing.

use dom_query::{Document, NodeRef, Selection};
use url::Url;

use super::{apply_property, is_product_type, StructuredError, StructuredSource};
use crate::dom;
use crate::result::{Candidate, Provenance};

/// Microdata structured-data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicrodataSource;

impl StructuredSource for MicrodataSource {
    fn provenance(&self) -> Provenance {
        Provenance::Microdata
    }

    fn extract(&self, doc: &Document, base: Option<&Url>) -> Result<Candidate, StructuredError> {
        let mut candidate = Candidate::new(Provenance::Microdata);

        let mut product_scopes = 0;
        let scopes = doc.select("[itemscope][itemtype]");
        for scope in scopes.iter() {
            if !is_product_type(&dom::attr(&scope, "itemtype")) {
                continue;
            }
            let Some(scope_node) = scope.nodes().first().copied() else {
                continue;
            };
            product_scopes += 1;
            read_scope(&scope, &scope_node, base, &mut candidate);
        }

        if product_scopes > 0 && candidate.is_empty() {
            return Err(StructuredError::Markup(format!(
                "{product_scopes} product scope(s) without readable properties"
            )));
        }
        Ok(candidate)
    }
}

/// Read the properties that belong directly to `scope` (not to a nested item).
fn read_scope(scope: &Selection, scope_node: &NodeRef, base: Option<&Url>, candidate: &mut Candidate) {
    for prop in scope.select("[itemprop]").iter() {
        let Some(node) = prop.nodes().first().copied() else {
            continue;
        };
        if owning_scope(&node).is_none_or(|owner| owner.id != scope_node.id) {
            continue;
        }

        let names = dom::attr(&prop, "itemprop");
        for name in names.split_whitespace() {
            match name {
                "additionalProperty" if prop.has_attr("itemscope") => {
                    read_property_value(&prop, &node, candidate);
                }
                "brand" | "manufacturer" if prop.has_attr("itemscope") => {
                    if let Some(brand) = nested_name(&prop, &node) {
                        apply_property(candidate, name, &brand, base);
                    }
                }
                _ if prop.has_attr("itemscope") => {}
                _ => apply_property(candidate, name, &item_value(&prop), base),
            }
        }
    }
}

/// Nearest ancestor (excluding the node itself) carrying `itemscope`.
fn owning_scope<'a>(node: &NodeRef<'a>) -> Option<NodeRef<'a>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.is_element() && parent.has_attr("itemscope") {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

/// `name` of a nested item such as `<div itemprop="brand" itemscope><span itemprop="name">`.
fn nested_name(item: &Selection, item_node: &NodeRef) -> Option<String> {
    item.select("[itemprop]")
        .iter()
        .filter(|p| {
            p.nodes()
                .first()
                .and_then(owning_scope)
                .is_some_and(|owner| owner.id == item_node.id)
        })
        .find(|p| dom::attr(p, "itemprop").split_whitespace().any(|n| n == "name"))
        .map(|p| item_value(&p))
        .filter(|v| !v.trim().is_empty())
}

/// `PropertyValue` item: `name` + `value` become a spec.
fn read_property_value(item: &Selection, item_node: &NodeRef, candidate: &mut Candidate) {
    let mut name = None;
    let mut value = None;
    let mut unit = None;

    for prop in item.select("[itemprop]").iter() {
        let owned = prop
            .nodes()
            .first()
            .and_then(owning_scope)
            .is_some_and(|owner| owner.id == item_node.id);
        if !owned {
            continue;
        }
        let text = item_value(&prop);
        match dom::attr(&prop, "itemprop").as_str() {
            "name" => name = Some(text),
            "value" => value = Some(text),
            "unitText" => unit = Some(text),
            _ => {}
        }
    }

    if let (Some(name), Some(value)) = (name, value) {
        let value = match unit {
            Some(unit) if !unit.trim().is_empty() => format!("{} {}", value.trim(), unit.trim()),
            _ => value,
        };
        let name = dom::normalize_ws(&name);
        let value = dom::normalize_ws(&value);
        if !name.is_empty() && !value.is_empty() {
            candidate.specs.entry(name).or_insert(value);
        }
    }
}

/// Microdata property value by element type.
fn item_value(prop: &Selection) -> String {
    if let Some(content) = prop.attr("content") {
        return content.to_string();
    }
    let attr_name = match dom::tag_name(prop).as_deref() {
        Some("meta") => "content",
        Some("img" | "source" | "audio" | "video" | "embed" | "iframe") => "src",
        Some("a" | "link" | "area") => "href",
        Some("object") => "data",
        Some("data" | "meter") => "value",
        Some("time") => "datetime",
        _ => return dom::text(prop),
    };
    dom::attr(prop, attr_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Candidate {
        let doc = Document::from(html);
        let base = Url::parse("https://shop.example.com/p/chair").ok();
        MicrodataSource
            .extract(&doc, base.as_ref())
            .unwrap_or_else(|_| Candidate::new(Provenance::Microdata))
    }

    #[test]
    fn test_reads_product_scope() {
        let candidate = extract(
            r#"<div itemscope itemtype="https://schema.org/Product">
                <h1 itemprop="name">Lift Chair</h1>
                <div itemprop="brand" itemscope itemtype="https://schema.org/Brand">
                    <span itemprop="name">Acme</span>
                </div>
                <meta itemprop="sku" content="LC-9">
                <img itemprop="image" src="/img/lc-9.jpg">
                <p itemprop="description">Power lift recliner.</p>
                <div itemprop="offers" itemscope itemtype="https://schema.org/Offer">
                    <span itemprop="name">Offer name</span>
                    <span itemprop="price">499</span>
                </div>
                <div itemprop="additionalProperty" itemscope itemtype="https://schema.org/PropertyValue">
                    <span itemprop="name">Weight Capacity</span>
                    <span itemprop="value">375</span>
                    <span itemprop="unitText">lb</span>
                </div>
            </div>"#,
        );

        assert_eq!(candidate.name.as_deref(), Some("Lift Chair"));
        assert_eq!(candidate.brand.as_deref(), Some("Acme"));
        assert_eq!(candidate.sku.as_deref(), Some("LC-9"));
        assert_eq!(candidate.description.as_deref(), Some("Power lift recliner."));
        assert_eq!(candidate.images, vec!["https://shop.example.com/img/lc-9.jpg"]);
        assert_eq!(candidate.specs.get("Weight Capacity").map(String::as_str), Some("375 lb"));
    }

    #[test]
    fn test_ignores_non_product_scopes() {
        let candidate = extract(
            r#"<div itemscope itemtype="https://schema.org/Organization">
                <span itemprop="name">Store Inc</span>
            </div>"#,
        );
        assert!(candidate.is_empty());
    }

    #[test]
    fn test_product_scope_without_properties_is_malformed() {
        let doc = Document::from(
            r#"<div itemscope itemtype="https://schema.org/Product">
                <h1>Lift Chair</h1>
                <div itemprop="offers" itemscope itemtype="https://schema.org/Offer">
                    <span itemprop="price">499</span>
                </div>
            </div>"#,
        );
        let err = MicrodataSource.extract(&doc, None).unwrap_err();
        assert!(matches!(err, StructuredError::Markup(msg) if msg.starts_with("1 product scope")));

        let none = Document::from("<p>No structured data</p>");
        assert!(MicrodataSource.extract(&none, None).is_ok_and(|c| c.is_empty()));
    }
}
