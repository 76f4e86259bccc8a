//! Noise filter and normalizer.
//!
//! Pure functions applied wherever text enters a product record: boilerplate
//! line rejection, bullet fusion, spec key canonicalization with unit
//! normalization, and bounded, deduplicated lists. All vocabulary comes from an
//! injected [`Vocabulary`].

mod specs;
mod vocabulary;

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::{Regex, RegexSet};

pub use specs::{normalize_units, snake_key, split_dimensions};
pub use vocabulary::Vocabulary;

use crate::dom::normalize_ws;
use crate::error::{Error, Result};
use crate::patterns::{BULLET_PREFIX, PAGE_NUMBER_LINE, PART_NUMBER_LINE};
use crate::result::{push_unique_ci, Candidate, ProductRecord};
use crate::url_utils;

/// Feature cap on a first extraction pass.
pub const FEATURES_FIRST_CAP: usize = 24;
/// Feature cap after merging tabs and manuals.
pub const FEATURES_MERGED_CAP: usize = 20;
/// Image cap on a first extraction pass.
pub const IMAGES_FIRST_CAP: usize = 16;
/// Image cap of the final record.
pub const IMAGES_FINAL_CAP: usize = 12;
/// Manual cap.
pub const MANUALS_CAP: usize = 8;

/// Lines at most this long that end in `:` or a dash are fragment preludes.
const PRELUDE_MAX_CHARS: usize = 40;
const FEATURE_MIN_CHARS: usize = 3;
const FEATURE_MAX_CHARS: usize = 300;
const SPEC_KEY_MAX_CHARS: usize = 48;
const SPEC_VALUE_MAX_CHARS: usize = 200;

/// Placeholder spec values that carry no information.
const EMPTY_VALUES: &[&str] = &["n/a", "na", "-", "--", "—", "tbd", "tba", "null", "undefined"];

#[allow(clippy::expect_used)]
static DEFAULT_FILTER: LazyLock<NoiseFilter> =
    LazyLock::new(|| NoiseFilter::new(Vocabulary::default()).expect("built-in vocabulary compiles"));

/// Compiled noise filter.
///
/// Cloning is cheap; compiled regexes are reference counted.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    vocabulary: Vocabulary,
    noise_phrases: Regex,
    domain_terms: Regex,
    headings: HashSet<String>,
    synonyms: Vec<(Regex, String)>,
    canonical_keys: HashSet<String>,
    key_rejects: RegexSet,
    allowed_keys: RegexSet,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        DEFAULT_FILTER.clone()
    }
}

/// Case-insensitive alternation of literal phrases, anchored on word
/// boundaries wherever the phrase starts or ends with a word character.
fn phrase_regex(phrases: &[String]) -> std::result::Result<Regex, regex::Error> {
    let alternatives: Vec<String> = phrases
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| {
            let starts_word = p.chars().next().is_some_and(char::is_alphanumeric);
            let ends_word = p.chars().last().is_some_and(char::is_alphanumeric);
            format!(
                "{}{}{}",
                if starts_word { r"\b" } else { "" },
                regex::escape(p),
                if ends_word { r"\b" } else { "" }
            )
        })
        .collect();

    if alternatives.is_empty() {
        // matches nothing
        return Regex::new(r"[^\s\S]");
    }
    Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))
}

fn config_error(what: &str, err: &regex::Error) -> Error {
    Error::Config(format!("{what}: {err}"))
}

impl NoiseFilter {
    /// Compile a filter from `vocabulary`.
    ///
    /// # Errors
    /// `Error::Config` when a pattern in the vocabulary does not compile.
    pub fn new(vocabulary: Vocabulary) -> Result<Self> {
        let noise_phrases =
            phrase_regex(&vocabulary.noise_phrases).map_err(|e| config_error("noise phrases", &e))?;
        let domain_terms =
            phrase_regex(&vocabulary.domain_terms).map_err(|e| config_error("domain terms", &e))?;

        let synonyms = vocabulary
            .key_synonyms
            .iter()
            .map(|(pattern, key)| {
                Regex::new(pattern)
                    .map(|re| (re, key.clone()))
                    .map_err(|e| config_error("key synonym", &e))
            })
            .collect::<Result<Vec<_>>>()?;

        let key_rejects =
            RegexSet::new(&vocabulary.key_rejects).map_err(|e| config_error("key rejects", &e))?;
        let allowed_keys =
            RegexSet::new(&vocabulary.allowed_keys).map_err(|e| config_error("allowed keys", &e))?;

        let headings = vocabulary
            .heading_words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .collect();
        let canonical_keys = vocabulary.key_synonyms.iter().map(|(_, k)| k.clone()).collect();

        Ok(Self {
            vocabulary,
            noise_phrases,
            domain_terms,
            headings,
            synonyms,
            canonical_keys,
            key_rejects,
            allowed_keys,
        })
    }

    /// The vocabulary this filter was built from.
    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    // === Line classification ===

    /// Whether `line` is only a section heading such as `Specifications:`.
    #[must_use]
    pub fn is_heading(&self, line: &str) -> bool {
        let normalized = line
            .trim()
            .trim_end_matches([':', '.', '-', '–'])
            .trim()
            .to_lowercase();
        self.headings.contains(&normalized)
    }

    /// Whether `line` is boilerplate and must not enter the record.
    ///
    /// Rejects empty or letterless lines, headings, page numbers,
    /// part-number-shaped tokens, bare URLs and any vocabulary noise phrase.
    #[must_use]
    pub fn is_noise(&self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() || !line.chars().any(char::is_alphabetic) {
            return true;
        }
        if self.is_heading(line) {
            return true;
        }
        if PAGE_NUMBER_LINE.is_match(line) || PART_NUMBER_LINE.is_match(line) {
            return true;
        }
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.") {
            return true;
        }
        self.noise_phrases.is_match(line)
    }

    // === Lists ===

    /// Clean a list of feature-like lines: strip bullet glyphs, drop headings,
    /// fuse fragment preludes, drop noise and out-of-range lengths, dedupe
    /// case-insensitively and cap at `cap`.
    #[must_use]
    pub fn clean_lines<S: AsRef<str>>(&self, lines: &[S], cap: usize) -> Vec<String> {
        let stripped: Vec<String> = lines
            .iter()
            .map(|l| strip_bullet(l.as_ref()))
            .filter(|l| !l.is_empty() && !self.is_heading(l))
            .collect();

        let mut out = Vec::new();
        for line in fuse_bullets(&stripped) {
            if out.len() >= cap {
                break;
            }
            let len = line.chars().count();
            if !(FEATURE_MIN_CHARS..=FEATURE_MAX_CHARS).contains(&len) || self.is_noise(&line) {
                continue;
            }
            push_unique_ci(&mut out, line);
        }
        out
    }

    /// Feature cleanup with the first-pass cap.
    #[must_use]
    pub fn clean_features(&self, features: &[String]) -> Vec<String> {
        self.clean_lines(features, FEATURES_FIRST_CAP)
    }

    /// Clean a free-text description: normalize whitespace per line, drop noise
    /// lines and repeated lines.
    #[must_use]
    pub fn clean_description(&self, text: &str) -> String {
        let mut kept: Vec<String> = Vec::new();
        for line in text.lines().map(normalize_ws) {
            if self.is_noise(&line) {
                continue;
            }
            push_unique_ci(&mut kept, line);
        }
        kept.join("\n")
    }

    // === Specs ===

    /// Canonical key for a raw spec label, or `None` when the label is rejected.
    #[must_use]
    pub fn canonical_key(&self, label: &str) -> Option<String> {
        let key = snake_key(label);
        if key.is_empty()
            || key.len() > SPEC_KEY_MAX_CHARS
            || !key.chars().any(char::is_alphabetic)
            || key.split('_').count() > self.vocabulary.max_key_words
            || self.key_rejects.is_match(&key)
        {
            return None;
        }

        let canonical = self
            .synonyms
            .iter()
            .find(|(re, _)| re.is_match(&key))
            .map_or(key, |(_, canonical)| canonical.clone());
        Some(canonical)
    }

    /// Normalize one spec pair. Returns `None` when the key is rejected, the
    /// value is empty or noise, or neither key nor value looks like a
    /// specification.
    #[must_use]
    pub fn normalize_spec(&self, label: &str, value: &str) -> Option<(String, String)> {
        let key = self.canonical_key(label)?;
        let value = normalize_units(value.trim().trim_end_matches([';', ',']));

        if value.is_empty()
            || value.chars().count() > SPEC_VALUE_MAX_CHARS
            || EMPTY_VALUES.contains(&value.to_lowercase().as_str())
            || self.noise_phrases.is_match(&value)
        {
            return None;
        }

        let recognized = self.canonical_keys.contains(&key)
            || self.allowed_keys.is_match(&key)
            || specs::UNIT_VALUE.is_match(&value)
            || self.domain_terms.is_match(&value);

        recognized.then_some((key, value))
    }

    /// Canonicalize and gate a spec map. The first pair (in key order) wins
    /// when several labels map to the same canonical key. A three-dimension
    /// `dimensions` value is also split into width/depth/height when those
    /// keys are absent.
    #[must_use]
    pub fn clean_specs(&self, specs: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (label, value) in specs {
            if let Some((key, value)) = self.normalize_spec(label, value) {
                out.entry(key).or_insert(value);
            }
        }
        decompose_dimensions(&mut out);
        out
    }

    // === Records ===

    /// Clean every field of a candidate before it is merged.
    #[must_use]
    pub fn clean_candidate(&self, mut candidate: Candidate) -> Candidate {
        candidate.name = clean_scalar(candidate.name);
        candidate.brand = clean_scalar(candidate.brand);
        candidate.sku = clean_scalar(candidate.sku);
        candidate.description = candidate
            .description
            .map(|d| self.clean_description(&d))
            .filter(|d| !d.is_empty());
        candidate.specs = self.clean_specs(&candidate.specs);
        candidate.features = self.clean_features(&candidate.features);
        candidate.images = dedupe_images(candidate.images, IMAGES_FIRST_CAP);
        candidate.manuals = dedupe_manuals(candidate.manuals, MANUALS_CAP);
        candidate
    }

    /// Post-hoc cleanup of a finished record: every field is re-filtered and
    /// every list re-capped. Running it twice changes nothing.
    pub fn sanitize_record(&self, record: &mut ProductRecord, max_images: usize, max_manuals: usize) {
        record.name = normalize_ws(&record.name);
        record.brand = clean_scalar(record.brand.take());
        record.sku = clean_scalar(record.sku.take());
        record.description = self.clean_description(&record.description);
        record.specs = self.clean_specs(&record.specs);
        record.features = self.clean_lines(&record.features, FEATURES_MERGED_CAP);

        let mut seen = HashSet::new();
        record
            .images
            .retain(|img| seen.insert(url_utils::image_dedup_key(&img.url)));
        record.images.truncate(max_images);

        record.manuals = dedupe_manuals(std::mem::take(&mut record.manuals), max_manuals);
    }
}

fn clean_scalar(value: Option<String>) -> Option<String> {
    value.map(|v| normalize_ws(&v)).filter(|v| !v.is_empty())
}

/// Remove leading bullet glyphs and list markers, repeatedly.
fn strip_bullet(line: &str) -> String {
    let mut current = normalize_ws(line);
    loop {
        let next = BULLET_PREFIX.replace(&current, "").trim().to_string();
        if next == current {
            return current;
        }
        current = next;
    }
}

fn is_prelude(line: &str) -> bool {
    let t = line.trim_end();
    t.chars().count() <= PRELUDE_MAX_CHARS && (t.ends_with(':') || t.ends_with(['-', '–', '—']))
}

/// Merge each short line ending in `:` or a dash with the line that follows.
///
/// A prelude left dangling at the end has nothing to introduce and is dropped,
/// so no orphaned fragments remain.
///
/// # Examples
///
/// ```
/// use rs_product_extract::noise::fuse_bullets;
///
/// assert_eq!(fuse_bullets(&["Powerful:", "runs quietly."]), vec!["Powerful: runs quietly."]);
/// ```
#[must_use]
pub fn fuse_bullets<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut iter = lines
        .iter()
        .map(|l| normalize_ws(l.as_ref()))
        .filter(|l| !l.is_empty());

    while let Some(mut current) = iter.next() {
        let mut complete = !is_prelude(&current);
        while !complete {
            match iter.next() {
                Some(next) => {
                    current = format!("{current} {next}");
                    complete = !is_prelude(&current);
                }
                None => break,
            }
        }
        if complete {
            out.push(current);
        }
    }
    out
}

fn dedupe_images(images: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    images
        .into_iter()
        .filter(|url| seen.insert(url_utils::image_dedup_key(url)))
        .take(cap)
        .collect()
}

fn dedupe_manuals(manuals: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    manuals
        .into_iter()
        .filter(|url| seen.insert(url_utils::normalize_url(url)))
        .take(cap)
        .collect()
}

fn decompose_dimensions(specs: &mut BTreeMap<String, String>) {
    let Some([width, depth, height]) = specs.get("dimensions").and_then(|d| split_dimensions(d)) else {
        return;
    };
    for (key, value) in [("width", width), ("depth", depth), ("height", height)] {
        specs.entry(key.to_string()).or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> NoiseFilter {
        NoiseFilter::default()
    }

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn noise_lines_are_rejected() {
        let f = filter();
        assert!(f.is_noise("Add to Cart"));
        assert!(f.is_noise("Free shipping on orders over $49"));
        assert!(f.is_noise("Specifications:"));
        assert!(f.is_noise("SKU: 99812"));
        assert!(f.is_noise("Page 2 of 8"));
        assert!(f.is_noise("https://example.com/x"));
        assert!(f.is_noise("   "));
        assert!(!f.is_noise("Folds flat for easy storage"));
        assert!(!f.is_noise("Supports up to 300 lb"));
    }

    #[test]
    fn noise_phrases_respect_word_boundaries() {
        let f = filter();
        // "qty" must not match inside another word
        assert!(!f.is_noise("Quality aluminum frame"));
        assert!(f.is_noise("Qty 1"));
    }

    #[test]
    fn fuse_bullets_merges_prelude_with_next_line() {
        let lines = ["Powerful:", "runs quietly."];
        assert_eq!(fuse_bullets(&lines), vec!["Powerful: runs quietly."]);
    }

    #[test]
    fn fuse_bullets_drops_dangling_prelude_and_chains() {
        let lines = ["Comfort:", "Extra:", "padded seat", "Lightweight", "Note:"];
        assert_eq!(
            fuse_bullets(&lines),
            vec!["Comfort: Extra: padded seat", "Lightweight"]
        );
    }

    #[test]
    fn clean_lines_strips_bullets_and_headings() {
        let f = filter();
        let lines = ["Features:", "• Folds flat", "- folds flat", "Add to cart", "✓ Powerful:", "runs quietly."];
        assert_eq!(f.clean_lines(&lines, 10), vec!["Folds flat", "Powerful: runs quietly."]);
    }

    #[test]
    fn clean_lines_respects_cap() {
        let f = filter();
        let lines: Vec<String> = (0..40).map(|i| format!("Feature number {i} here")).collect();
        assert_eq!(f.clean_lines(&lines, FEATURES_FIRST_CAP).len(), 24);
    }

    #[test]
    fn features_cleanup_is_idempotent() {
        let f = filter();
        let lines = [
            "Key Features",
            "  •  Lightweight aluminum frame ",
            "Comfort:",
            "padded armrests",
            "SKU 12345",
            "LIGHTWEIGHT ALUMINUM FRAME",
            "1) Tool-free assembly",
        ];
        let once = f.clean_lines(&lines, FEATURES_FIRST_CAP);
        let twice = f.clean_lines(&once, FEATURES_FIRST_CAP);
        assert_eq!(once, twice);
        assert_eq!(
            once,
            vec!["Lightweight aluminum frame", "Comfort: padded armrests", "Tool-free assembly"]
        );
    }

    #[test]
    fn canonical_keys_use_synonyms() {
        let f = filter();
        assert_eq!(f.canonical_key("Weight Capacity").as_deref(), Some("weight_capacity"));
        assert_eq!(f.canonical_key("Max. User Weight").as_deref(), Some("weight_capacity"));
        assert_eq!(f.canonical_key("Model No.").as_deref(), Some("model_number"));
        assert_eq!(f.canonical_key("Maximum Speed").as_deref(), Some("top_speed"));
        assert_eq!(f.canonical_key("Colour").as_deref(), Some("color"));
        assert_eq!(f.canonical_key("Seat Width").as_deref(), Some("seat_width"));
    }

    #[test]
    fn canonical_keys_reject_junk() {
        let f = filter();
        assert_eq!(f.canonical_key("Ordering Code"), None);
        assert_eq!(f.canonical_key("Price"), None);
        assert_eq!(f.canonical_key("debug_flag"), None);
        assert_eq!(
            f.canonical_key("this is really a whole sentence about the product"),
            None
        );
        assert_eq!(f.canonical_key("12345"), None);
    }

    #[test]
    fn spec_allowlist_gate() {
        let f = filter();
        assert!(f.normalize_spec("Weight Capacity", "300 lbs").is_some());
        assert!(f.normalize_spec("Frame", "Aluminum").is_some());
        assert!(f.normalize_spec("Mystery", "42 kg").is_some());
        assert!(f.normalize_spec("Mystery", "banana").is_none());
        assert!(f.normalize_spec("Weight", "N/A").is_none());
        assert!(f.normalize_spec("Weight", "Add to cart").is_none());
    }

    #[test]
    fn clean_specs_canonicalizes_and_decomposes() {
        let f = filter();
        let cleaned = f.clean_specs(&map(&[
            ("Weight Capacity", "300 Pounds"),
            ("Dimensions", "24\" x 30\" x 40\""),
            ("Price", "$199"),
        ]));
        assert_eq!(cleaned.get("weight_capacity").map(String::as_str), Some("300 lb"));
        assert_eq!(cleaned.get("dimensions").map(String::as_str), Some("24 in x 30 in x 40 in"));
        assert_eq!(cleaned.get("width").map(String::as_str), Some("24 in"));
        assert_eq!(cleaned.get("depth").map(String::as_str), Some("30 in"));
        assert_eq!(cleaned.get("height").map(String::as_str), Some("40 in"));
        assert!(!cleaned.contains_key("price"));
    }

    #[test]
    fn clean_specs_keeps_explicit_dimension_fields() {
        let f = filter();
        let cleaned = f.clean_specs(&map(&[("Dimensions", "24 x 30 x 40 in"), ("Width", "26 in")]));
        assert_eq!(cleaned.get("width").map(String::as_str), Some("26 in"));
        assert_eq!(cleaned.get("height").map(String::as_str), Some("40 in"));
    }

    #[test]
    fn clean_specs_is_idempotent() {
        let f = filter();
        let raw = map(&[
            ("Max. User Weight", "250 lbs."),
            ("Overall Dimensions", "25\" W x 22\" D x 36\" H"),
            ("Colour", "Blue"),
            ("Frame Material", "Steel"),
            ("Ordering Info", "call"),
            ("Top Speed", "4.25 MPH"),
        ]);
        let once = f.clean_specs(&raw);
        let twice = f.clean_specs(&once);
        assert_eq!(once, twice);
        assert_eq!(once.get("top_speed").map(String::as_str), Some("4.25 mph"));
    }

    #[test]
    fn description_cleanup_drops_noise_and_repeats() {
        let f = filter();
        let cleaned = f.clean_description(
            "Description\nA sturdy   walker for daily use.\nAdd to cart\na sturdy walker for daily use.\nFolds flat.",
        );
        assert_eq!(cleaned, "A sturdy walker for daily use.\nFolds flat.");
    }

    #[test]
    fn custom_vocabulary_is_honored() {
        let vocab = Vocabulary {
            noise_phrases: vec!["limited edition".to_string()],
            ..Vocabulary::default()
        };
        let f = NoiseFilter::new(vocab).unwrap_or_default();
        assert!(f.is_noise("Limited Edition colors"));
        assert!(!f.is_noise("Add to cart now"));
    }

    #[test]
    fn invalid_vocabulary_pattern_is_a_config_error() {
        let vocab = Vocabulary {
            key_rejects: vec!["(".to_string()],
            ..Vocabulary::default()
        };
        assert!(matches!(NoiseFilter::new(vocab), Err(Error::Config(_))));
    }

    #[test]
    fn sanitize_record_is_idempotent() {
        let f = filter();
        let mut record = ProductRecord::new("https://shop.example.com/p");
        record.name = "  Walker   Pro ".into();
        record.description = "Great walker.\nGreat walker.".into();
        record.features = vec!["Strong:".into(), "steel frame".into(), "Buy now".into()];
        record.specs = map(&[("Weight Capacity", "300 lbs")]);
        for i in 0..15 {
            record.push_image(format!("https://cdn.example.com/img-{i}.jpg"));
        }

        f.sanitize_record(&mut record, IMAGES_FINAL_CAP, MANUALS_CAP);
        let once = record.clone();
        f.sanitize_record(&mut record, IMAGES_FINAL_CAP, MANUALS_CAP);

        assert_eq!(once, record);
        assert_eq!(record.name, "Walker Pro");
        assert_eq!(record.description, "Great walker.");
        assert_eq!(record.features, vec!["Strong: steel frame"]);
        assert_eq!(record.images.len(), 12);
        assert!(record.specs.contains_key("weight_capacity"));
    }
}
