//! Spec label and value normalization.
//!
//! Labels become snake_case keys; values get canonical unit abbreviations,
//! ` x ` multiplication signs, and three-dimension strings can be split into
//! width/depth/height.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::normalize_ws;

/// Unit rewrite table, applied in order.
static UNIT_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r#"(\d)\s*(?:″|")"#, "${1} in"),
        (r"(?i)(\d)\s*(?:inches|inch|in)\b\.?", "${1} in"),
        (r"(?i)(\d)\s*(?:lbs|lb|pounds|pound)\b\.?", "${1} lb"),
        (r"(?i)(\d)\s*(?:kilograms|kilogram|kgs|kg)\b\.?", "${1} kg"),
        (r"(?i)(\d)\s*(?:ounces|ounce|oz)\b\.?", "${1} oz"),
        (r"(?i)(\d)\s*(?:centimeters|centimetres|centimeter|centimetre|cm)\b\.?", "${1} cm"),
        (r"(?i)(\d)\s*(?:millimeters|millimetres|millimeter|millimetre|mm)\b\.?", "${1} mm"),
        (r"(?i)(\d)\s*(?:feet|foot|ft)\b\.?", "${1} ft"),
        (r"(?i)(\d)\s*(?:miles per hour|m\.p\.h\.|mph)", "${1} mph"),
        (r"(?i)(\d)\s*(?:km/h|kmh|kph)\b", "${1} km/h"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("unit regex"), replacement))
    .collect()
});

/// `24 in x 30`, `24x30`, `24 × 30`: a number (with optional length unit)
/// followed by a multiplication sign and another number.
static MULTIPLY_SIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d(?:\.\d+)?(?:\s*(?:in|cm|mm|ft|m)\b)?)\s*[x×*]\s*(\d)").expect("MULTIPLY_SIGN regex")
});

/// Three dimensions with optional per-dimension units.
static THREE_DIMENSIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(\d+(?:\.\d+)?)\s*(in|cm|mm|ft|m)?\s*x\s*(\d+(?:\.\d+)?)\s*(in|cm|mm|ft|m)?\s*x\s*(\d+(?:\.\d+)?)\s*(in|cm|mm|ft|m)?",
    )
    .expect("THREE_DIMENSIONS regex")
});

/// A number followed by a recognized unit.
pub(crate) static UNIT_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\d(?:[\d.,]*)\s*(?:lb|lbs|kg|g|oz|in|"|cm|mm|m|ft|mph|km/h|v|w|wh|ah|mah|mi|miles|km|hrs?|hours|min|sec|°|%|psi|db|l|ml|gal|rpm|hz|a)\b"#,
    )
    .expect("UNIT_VALUE regex")
});

/// Label to snake_case: lowercase, `&` to `and`, non-alphanumerics to `_`,
/// collapsed and trimmed.
///
/// # Examples
///
/// ```
/// use rs_product_extract::noise::snake_key;
///
/// assert_eq!(snake_key("Weight Capacity:"), "weight_capacity");
/// assert_eq!(snake_key("Dimensions (W x D x H)"), "dimensions_w_x_d_x_h");
/// ```
#[must_use]
pub fn snake_key(label: &str) -> String {
    let lowered = label.trim().to_lowercase().replace('&', " and ");
    let mut key = String::with_capacity(lowered.len());
    let mut pending_sep = false;
    for ch in lowered.chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.push(ch);
        } else {
            pending_sep = true;
        }
    }
    key
}

/// Rewrite units to fixed abbreviations and normalize multiplication signs.
///
/// Idempotent: normalizing an already-normalized value returns it unchanged.
#[must_use]
pub fn normalize_units(value: &str) -> String {
    let mut out = normalize_ws(value);
    for (re, replacement) in UNIT_RULES.iter() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out = MULTIPLY_SIGN.replace_all(&out, "${1} x ${2}").into_owned();
    normalize_ws(&out)
}

/// Split a `W x D x H` value into `[width, depth, height]`.
///
/// A dimension without its own unit takes the last unit given.
#[must_use]
pub fn split_dimensions(value: &str) -> Option<[String; 3]> {
    let caps = THREE_DIMENSIONS.captures(value)?;
    let trailing_unit = [6, 4, 2]
        .iter()
        .find_map(|&i| caps.get(i).map(|m| m.as_str().to_lowercase()));

    let part = |num: usize, unit: usize| -> String {
        let number = &caps[num];
        match caps.get(unit).map(|m| m.as_str().to_lowercase()).or_else(|| trailing_unit.clone()) {
            Some(unit) => format!("{number} {unit}"),
            None => number.to_string(),
        }
    };

    Some([part(1, 2), part(3, 4), part(5, 6)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_key_collapses_separators() {
        assert_eq!(snake_key("  Top Speed "), "top_speed");
        assert_eq!(snake_key("Size & Fit"), "size_and_fit");
        assert_eq!(snake_key("Model #"), "model");
        assert_eq!(snake_key("---"), "");
    }

    #[test]
    fn units_are_abbreviated() {
        assert_eq!(normalize_units("300 lbs."), "300 lb");
        assert_eq!(normalize_units("300 Pounds"), "300 lb");
        assert_eq!(normalize_units("12 inches"), "12 in");
        assert_eq!(normalize_units("12\""), "12 in");
        assert_eq!(normalize_units("4.25 MPH"), "4.25 mph");
        assert_eq!(normalize_units("20 kilograms"), "20 kg");
    }

    #[test]
    fn multiplication_signs_are_normalized() {
        assert_eq!(normalize_units("24\" × 30\" × 40\""), "24 in x 30 in x 40 in");
        assert_eq!(normalize_units("24x30x40 cm"), "24 x 30 x 40 cm");
        assert_eq!(normalize_units("Model X5"), "Model X5");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["300 lbs", "24\" W x 30\" D", "4.25 mph", "Steel frame", "10 x 12 in."] {
            let once = normalize_units(raw);
            assert_eq!(normalize_units(&once), once, "not idempotent for {raw}");
        }
    }

    #[test]
    fn dimensions_split_with_trailing_unit() {
        let dims = split_dimensions("24 x 30 x 40 in");
        assert_eq!(
            dims,
            Some(["24 in".to_string(), "30 in".to_string(), "40 in".to_string()])
        );
        let dims = split_dimensions("60 cm x 45 cm x 90 cm");
        assert_eq!(dims.map(|d| d[2].clone()).as_deref(), Some("90 cm"));
        assert!(split_dimensions("24 x 30").is_none());
    }
}
