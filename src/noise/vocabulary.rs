//! Noise and specification vocabularies.
//!
//! A `Vocabulary` is plain, immutable data handed to [`NoiseFilter::new`](super::NoiseFilter::new).
//! Different pipelines (for example per-tenant configurations) can each carry
//! their own vocabulary; nothing here is global state.

/// Word lists and pattern tables used by the noise filter and spec normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    /// Boilerplate phrases (matched case-insensitively on word boundaries).
    /// A line containing any of them is noise.
    pub noise_phrases: Vec<String>,

    /// Lines consisting only of one of these words (trailing `:` ignored) are
    /// section headings, not content.
    pub heading_words: Vec<String>,

    /// Terms that make a spec value plausible even without a number and unit.
    pub domain_terms: Vec<String>,

    /// `(pattern, canonical_key)` pairs. Patterns are regexes matched against
    /// the snake_case form of a spec label; the first match wins.
    pub key_synonyms: Vec<(String, String)>,

    /// Regexes over snake_case spec keys that are never specifications.
    pub key_rejects: Vec<String>,

    /// Regexes over snake_case spec keys that are recognized specifications.
    pub allowed_keys: Vec<String>,

    /// Keys with more words than this are treated as sentences, not labels.
    pub max_key_words: usize,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            noise_phrases: owned(&[
                // commerce chrome
                "add to cart", "add to bag", "add to basket", "add to wishlist", "add to wish list",
                "add to compare", "buy now", "checkout", "check out", "shopping cart", "view cart",
                "in stock", "out of stock", "sold out", "backorder", "pre-order", "qty", "quantity",
                "price", "regular price", "sale price", "subtotal", "msrp", "$", "€", "£",
                "free shipping", "ships in", "ships within", "free delivery", "financing",
                "afterpay", "klarna", "affirm", "as low as", "per month", "coupon", "promo code",
                "gift card", "return policy", "shipping policy", "price match",
                // legal
                "privacy policy", "terms of use", "terms and conditions", "terms of service",
                "all rights reserved", "copyright", "©", "cookie", "cookies", "prop 65",
                // navigation and accounts
                "skip to content", "skip to main", "back to top", "breadcrumb",
                "sign in", "sign up", "log in", "login", "my account", "create account",
                "shop now", "shop all", "learn more", "read more", "view more", "see more",
                "show more", "show less", "view details", "see details", "click here",
                // contact and social
                "contact us", "call us", "call now", "email us", "chat with", "live chat",
                "customer service", "customer support", "newsletter", "subscribe", "follow us",
                "facebook", "twitter", "instagram", "pinterest", "youtube", "tiktok", "linkedin",
                "share this", "write a review", "be the first to review", "customer reviews",
                "questions & answers", "ask a question", "recently viewed", "you may also like",
                "related products", "customers also bought", "frequently bought together",
            ]),
            heading_words: owned(&[
                "features", "key features", "product features", "highlights", "benefits",
                "specifications", "specification", "specs", "tech specs", "technical specifications",
                "technical data", "description", "product description", "overview",
                "product overview", "details", "product details", "additional information",
                "more information", "downloads", "documents", "documentation", "manuals",
                "resources", "literature", "dimensions", "warranty", "shipping", "faq", "faqs",
                "q&a", "what's in the box", "in the box", "includes", "accessories",
            ]),
            domain_terms: owned(&[
                "steel", "stainless", "aluminum", "aluminium", "alloy", "plastic", "polymer",
                "nylon", "polyester", "vinyl", "foam", "memory foam", "gel", "latex", "rubber",
                "silicone", "leather", "fabric", "mesh", "cotton", "wood", "oak", "bamboo",
                "carbon", "titanium", "glass", "ceramic", "chrome", "powder coated",
                "lithium", "li-ion", "lead acid", "agm", "battery", "charger", "motor",
                "brushless", "led", "lcd", "usb", "bluetooth", "wifi", "wi-fi",
                "foldable", "folding", "adjustable", "removable", "waterproof", "water resistant",
                "latex free", "pneumatic", "solid", "swivel", "locking", "manual", "electric",
                "yes", "no", "included", "not included", "black", "white", "grey", "gray",
                "silver", "blue", "red", "green", "beige", "brown",
            ]),
            key_synonyms: [
                (r"^(model|model_(no|num|number|name|#))$", "model_number"),
                (
                    r"^(part|part_(no|num|number|#)|mpn|manufacturer_part_(no|number)|item_(no|num|number|#)|sku|product_(code|number)|catalog_(no|number))$",
                    "part_number",
                ),
                (r"^(serial|serial_(no|num|number|#))$", "serial_number"),
                (
                    r"^(weight_capacity|max(imum)?_(weight|load|user_weight|weight_capacity|capacity)|(user|load|patient|rider)_weight(_capacity)?|(user_|load_)?capacity|weight_limit|weight_(rating|capacity_lbs?))$",
                    "weight_capacity",
                ),
                (r"^(weight|product_weight|item_weight|net_weight|unit_weight|weight_(lbs?|kg))$", "weight"),
                (r"^(shipping_weight|gross_weight|package_weight|boxed_weight)$", "shipping_weight"),
                (
                    r"^(dimensions?|overall_dimensions?|product_dimensions?|assembled_dimensions?|overall_size|item_dimensions?|dimensions_[whdl](_x_[whdl])+)$",
                    "dimensions",
                ),
                (r"^(shipping_dimensions?|box_dimensions?|package_dimensions?|carton_dimensions?)$", "shipping_dimensions"),
                (r"^(width|overall_width|product_width|total_width)$", "width"),
                (r"^(depth|overall_depth|product_depth|total_depth)$", "depth"),
                (r"^(height|overall_height|product_height|total_height)$", "height"),
                (r"^(length|overall_length|product_length|total_length)$", "length"),
                (r"^(top_speed|max(imum)?_speed|speed|max_forward_speed)$", "top_speed"),
                (r"^(range|driving_range|travel_range|max(imum)?_range|cruising_range|range_per_charge)$", "range"),
                (r"^(colou?rs?|colou?r_family|finish_colou?r)$", "color"),
                (r"^(materials?|construction|frame_construction)$", "material"),
                (r"^(brand|manufacturer|make|brand_name)$", "brand"),
                (r"^(warranty|warranty_(length|period|info|information|term))$", "warranty"),
                (r"^(battery|battery_type|battery_chemistry)$", "battery_type"),
                (r"^(voltage|rated_voltage|input_voltage|battery_voltage)$", "voltage"),
                (r"^(power|wattage|rated_power|motor_power|motor_wattage|output_power)$", "power"),
                (r"^(country_of_origin|origin|made_in|country_of_manufacture)$", "country_of_origin"),
                (r"^(upc|upc_code|gtin(_?1[234]|_?8)?|ean|barcode)$", "upc"),
            ]
            .iter()
            .map(|(pattern, key)| ((*pattern).to_string(), (*key).to_string()))
            .collect(),
            key_rejects: owned(&[
                r"^(ordering|order)_(code|codes|info|information|number)",
                r"^(debug|internal|js|var|ng|data)_",
                r"^_",
                r"^(price|sale_price|regular_price|list_price|msrp|cost|sku_id|product_id|variant_id|id|qty|quantity|availability|stock|in_stock|rating|ratings|reviews?|url|link|href|image|img|src|share|wishlist)$",
                r"^(shipping|returns?|delivery|free_shipping|financing)$",
                r"^\d+$",
            ]),
            allowed_keys: owned(&[
                r"(weight|capacity|load|dimension|width|depth|height|length|size|diameter|radius|clearance)",
                r"(speed|range|battery|charger|charging|charge|voltage|power|watt|amp|motor|runtime|run_time)",
                r"(material|color|finish|frame|seat|backrest|armrest|footrest|handle|wheel|tire|tyre|caster|brake|fold)",
                r"(model|part|serial|upc|gtin|brand|warranty|origin|certification|compliance|standard)",
                r"(display|screen|resolution|connectivity|noise|volume|temperature|pressure|flow|incline|levels|settings)",
                r"(type|style|assembly|included|accessories|quantity_per|pack|count)",
            ]),
            max_key_words: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vocabulary_is_populated() {
        let vocab = Vocabulary::default();
        assert!(vocab.noise_phrases.iter().any(|p| p == "add to cart"));
        assert!(vocab.heading_words.iter().any(|p| p == "specifications"));
        assert!(vocab.key_synonyms.iter().any(|(_, k)| k == "weight_capacity"));
        assert_eq!(vocab.max_key_words, 6);
    }
}
