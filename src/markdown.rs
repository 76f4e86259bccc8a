//! Markdown renderings of a product record.
//!
//! Produces the optional `description_md`, `features_md` and `specs_md`
//! fields: paragraphs, `- ` bullets, and a two-column GFM table.

use std::collections::BTreeMap;

/// Characters that have special meaning in Markdown and need escaping.
const MARKDOWN_SPECIAL_CHARS: &[char] = &['\\', '*', '_', '[', ']', '<', '>', '`'];

/// Escape Markdown special characters in text content.
///
/// # Examples
///
/// ```
/// use rs_product_extract::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("*not italic*"), r"\*not italic\*");
/// assert_eq!(escape_markdown("model_number"), r"model\_number");
/// ```
#[must_use]
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 4);

    for ch in text.chars() {
        if MARKDOWN_SPECIAL_CHARS.contains(&ch) {
            result.push('\\');
        }
        result.push(ch);
    }

    result
}

/// Escape text for use inside a table cell: markdown escapes plus `|`,
/// with line breaks flattened to spaces.
fn escape_cell(text: &str) -> String {
    escape_markdown(text)
        .replace('|', r"\|")
        .replace(['\r', '\n'], " ")
}

/// Render a description as markdown paragraphs.
///
/// Each non-empty line becomes its own paragraph.
#[must_use]
pub fn description_to_markdown(description: &str) -> String {
    description
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(escape_markdown)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render features as a `- ` bullet list.
#[must_use]
pub fn features_to_markdown(features: &[String]) -> String {
    features
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(|f| format!("- {}", escape_markdown(f)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render specs as a two-column GFM table with a `Specification | Value` header.
///
/// Keys are shown in title case (`weight_capacity` becomes `Weight Capacity`).
/// Returns an empty string when there are no specs.
///
/// Output format:
///
/// ```text
/// | Specification   | Value  |
/// | --------------- | ------ |
/// | Weight Capacity | 300 lb |
/// ```
#[must_use]
pub fn specs_to_markdown(specs: &BTreeMap<String, String>) -> String {
    if specs.is_empty() {
        return String::new();
    }

    let rows: Vec<(String, String)> = specs
        .iter()
        .map(|(k, v)| (escape_cell(&humanize_key(k)), escape_cell(v.trim())))
        .collect();

    let key_width = rows
        .iter()
        .map(|(k, _)| k.chars().count())
        .chain(std::iter::once("Specification".len()))
        .max()
        .unwrap_or(3);
    let value_width = rows
        .iter()
        .map(|(_, v)| v.chars().count())
        .chain(std::iter::once("Value".len()))
        .max()
        .unwrap_or(3);

    let mut output = String::new();
    push_row(&mut output, "Specification", key_width, "Value", value_width);
    output.push_str(&format!(
        "| {} | {} |\n",
        "-".repeat(key_width),
        "-".repeat(value_width)
    ));
    for (key, value) in &rows {
        push_row(&mut output, key, key_width, value, value_width);
    }

    output.trim_end().to_string()
}

fn push_row(output: &mut String, left: &str, left_width: usize, right: &str, right_width: usize) {
    output.push_str("| ");
    output.push_str(&pad_cell(left, left_width));
    output.push_str(" | ");
    output.push_str(&pad_cell(right, right_width));
    output.push_str(" |\n");
}

fn pad_cell(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len >= width {
        return text.to_string();
    }
    format!("{}{}", text, " ".repeat(width - text_len))
}

/// `weight_capacity` -> `Weight Capacity`.
fn humanize_key(key: &str) -> String {
    key.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
