//! PDF text layer extraction and text mining.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::ManualError;
use crate::extractor::specs::mine_lines;
use crate::noise::NoiseFilter;
use crate::patterns::PAGE_NUMBER_LINE;

/// Column gap inside a text-layer table row: a tab or 2+ spaces.
#[allow(clippy::expect_used)]
static COLUMN_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\t+|\s{2,}").expect("COLUMN_GAP regex"));

const FEATURE_MIN_CHARS: usize = 7;
const FEATURE_MAX_CHARS: usize = 180;

/// Reads the embedded text layer of a PDF.
///
/// Implementations are synchronous; callers run them on the blocking pool.
pub trait PdfTextExtractor: Send + Sync {
    /// Text of the whole document.
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ManualError>;
}

/// Text layer extraction with `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractText;

impl PdfTextExtractor for PdfExtractText {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ManualError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ManualError::Extract(e.to_string()))
    }
}

/// Trimmed, non-empty lines.
fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// Canonical `key: value` pairs found in the text. Pairs the noise filter
/// rejects are dropped.
#[must_use]
pub fn key_values(text: &str, filter: &NoiseFilter) -> BTreeMap<String, String> {
    let raw = mine_lines(&lines(text).collect::<Vec<_>>());
    filter.clean_specs(&raw)
}

/// Runs of at least two consecutive lines that split into the same number
/// (2 or more) of gap-separated columns.
#[must_use]
pub fn tables(text: &str) -> Vec<Vec<Vec<String>>> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    let mut flush = |current: &mut Vec<Vec<String>>| {
        if current.len() >= 2 {
            tables.push(std::mem::take(current));
        } else {
            current.clear();
        }
    };

    for line in lines(text) {
        let cells: Vec<String> = COLUMN_GAP
            .split(line)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        if cells.len() < 2 {
            flush(&mut current);
            continue;
        }
        if current.first().is_some_and(|row| row.len() != cells.len()) {
            flush(&mut current);
        }
        current.push(cells);
    }
    flush(&mut current);
    tables
}

/// Canonical pairs from the two-column rows of `tables`.
#[must_use]
pub fn table_pairs(tables: &[Vec<Vec<String>>], filter: &NoiseFilter) -> BTreeMap<String, String> {
    let raw: BTreeMap<String, String> = tables
        .iter()
        .flatten()
        .filter(|row| row.len() == 2)
        .map(|row| (row[0].trim_end_matches(':').to_string(), row[1].clone()))
        .collect();
    filter.clean_specs(&raw)
}

/// Feature-shaped lines: 7 to 180 chars, at least one letter, not a page number.
#[must_use]
pub fn feature_lines(text: &str) -> Vec<String> {
    lines(text)
        .filter(|l| {
            let len = l.chars().count();
            (FEATURE_MIN_CHARS..=FEATURE_MAX_CHARS).contains(&len)
                && l.chars().any(char::is_alphabetic)
                && !PAGE_NUMBER_LINE.is_match(l)
        })
        .map(str::to_string)
        .collect()
}
