//! Three-way field reconciliation between the DOM scrape, the PDF manuals and
//! the live page.
//!
//! For every key present in any input, the chosen value is the first non-null
//! one in A, B, C order. When the inputs disagree, a [`ConflictRecord`] names
//! the chosen source and lists every differing value that was dropped.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Origin of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Source {
    /// DOM scrape (A).
    #[serde(rename = "A")]
    Dom,
    /// PDF manuals (B).
    #[serde(rename = "B")]
    Pdf,
    /// Live page (C).
    #[serde(rename = "C")]
    Live,
}

impl Source {
    /// All sources in precedence order.
    pub const ORDER: [Source; 3] = [Source::Dom, Source::Pdf, Source::Live];

    /// Single-letter tag.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Dom => "A",
            Self::Pdf => "B",
            Self::Live => "C",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A disagreement on one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictRecord {
    /// Field key.
    pub field: String,
    /// Source of the kept value.
    pub chosen_source: Source,
    /// Dropped values that differ from the kept one, in source order.
    pub discarded: Vec<(Source, Value)>,
    /// Why the kept value won.
    pub reason: String,
}

impl ConflictRecord {
    /// Dropped values formatted as `Blue (from C)`.
    #[must_use]
    pub fn discarded_values(&self) -> Vec<String> {
        self.discarded
            .iter()
            .map(|(source, value)| format!("{} (from {source})", display_value(value)))
            .collect()
    }
}

/// Strings without quotes, everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reconcile three optional field maps. `null` counts as absent.
///
/// Output keys keep first-seen order across A, B, C.
#[must_use]
pub fn resolve(
    dom: Option<&Map<String, Value>>,
    pdf: Option<&Map<String, Value>>,
    live: Option<&Map<String, Value>>,
) -> (Map<String, Value>, Vec<ConflictRecord>) {
    let inputs: [(Source, Option<&Map<String, Value>>); 3] =
        [(Source::Dom, dom), (Source::Pdf, pdf), (Source::Live, live)];

    let mut keys: Vec<&String> = Vec::new();
    for map in inputs.iter().filter_map(|(_, m)| *m) {
        for key in map.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let mut resolved = Map::new();
    let mut conflicts = Vec::new();

    for key in keys {
        let present: Vec<(Source, &Value)> = inputs
            .iter()
            .filter_map(|(source, map)| {
                map.and_then(|m| m.get(key))
                    .filter(|v| !v.is_null())
                    .map(|v| (*source, v))
            })
            .collect();
        let Some(&(chosen_source, chosen)) = present.first() else {
            continue;
        };

        let discarded: Vec<(Source, Value)> = present
            .iter()
            .filter(|(_, v)| *v != chosen)
            .map(|(s, v)| (*s, (*v).clone()))
            .collect();
        if !discarded.is_empty() {
            conflicts.push(ConflictRecord {
                field: key.clone(),
                chosen_source,
                discarded,
                reason: format!("first non-null value in A, B, C order came from {chosen_source}"),
            });
        }
        resolved.insert(key.clone(), chosen.clone());
    }

    (resolved, conflicts)
}
