use std::collections::HashMap;
use std::sync::LazyLock;

use tracing::warn;

/// Closed header vocabulary as it appears in the source documents, uppercase.
const HEADER_VOCABULARY: &[&str] = &[
    "RICE",
    "CORN PRODUCTS",
    "FISH PRODUCTS",
    "BEEF MEAT PRODUCTS",
    "PORK MEAT PRODUCTS",
    "OTHER LIVESTOCK MEAT PRODUCTS",
    "POULTRY PRODUCTS",
    "LOWLAND VEGETABLES",
    "HIGHLAND VEGETABLES",
    "SPICES",
    "FRUITS",
    "OTHER BASIC COMMODITIES",
];

/// Header → display-cased canonical name, the form persistence sees.
const CANONICAL_TABLE: &[(&str, &str)] = &[
    ("RICE", "Rice"),
    ("CORN PRODUCTS", "Corn Products"),
    ("FISH PRODUCTS", "Fish Products"),
    ("BEEF MEAT PRODUCTS", "Beef Meat Products"),
    ("PORK MEAT PRODUCTS", "Pork Meat Products"),
    ("OTHER LIVESTOCK MEAT PRODUCTS", "Other Livestock Meat Products"),
    ("POULTRY PRODUCTS", "Poultry Products"),
    ("LOWLAND VEGETABLES", "Lowland Vegetables"),
    ("HIGHLAND VEGETABLES", "Highland Vegetables"),
    ("SPICES", "Spices"),
    ("FRUITS", "Fruits"),
    ("OTHER BASIC COMMODITIES", "Other Basic Commodities"),
];

static CANONICAL_NAMES: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| CANONICAL_TABLE.iter().copied().collect());

/// All canonical category names, in document order. Used to seed persistence.
pub fn canonical_names() -> impl Iterator<Item = &'static str> {
    CANONICAL_TABLE.iter().map(|(_, canonical)| *canonical)
}

/// Decide whether a line is a section header and return its canonical name.
///
/// Lines containing any digit are never headers: price rows share vocabulary
/// words ("Special Rice White Rice 56.97") and the digit test is what keeps
/// them out. Membership is exact after uppercasing, not substring.
pub fn classify(line: &str) -> Option<String> {
    if line.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let upper = line.trim().to_uppercase();
    if !HEADER_VOCABULARY.contains(&upper.as_str()) {
        return None;
    }
    match CANONICAL_NAMES.get(upper.as_str()) {
        Some(canonical) => Some((*canonical).to_string()),
        None => {
            // Vocabulary entry missing from the canonical table; a
            // configuration gap, not a data problem.
            warn!("no canonical name for recognized header {:?}", upper);
            Some(upper)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_every_vocabulary_entry() {
        for header in HEADER_VOCABULARY {
            assert!(classify(header).is_some(), "missed header {:?}", header);
        }
    }

    #[test]
    fn canonical_display_casing() {
        assert_eq!(classify("FISH PRODUCTS").as_deref(), Some("Fish Products"));
        assert_eq!(
            classify("OTHER BASIC COMMODITIES").as_deref(),
            Some("Other Basic Commodities")
        );
    }

    #[test]
    fn case_insensitive_and_trimmed() {
        assert_eq!(classify("  Fish Products  ").as_deref(), Some("Fish Products"));
        assert_eq!(classify("lowland vegetables").as_deref(), Some("Lowland Vegetables"));
    }

    #[test]
    fn lines_with_digits_are_never_headers() {
        assert!(classify("FISH PRODUCTS 2").is_none());
        assert!(classify("Special Rice White Rice 56.97").is_none());
        assert!(classify("Tomato 15-18 pcs/kg 155.30").is_none());
    }

    #[test]
    fn substring_matches_rejected() {
        // A substring policy would accept all of these.
        assert!(classify("FISH PRODUCTS AND SEAFOOD").is_none());
        assert!(classify("IMPORTED RICE").is_none());
        assert!(classify("ASSORTED SPICES SECTION").is_none());
    }

    #[test]
    fn ordinary_data_rows_rejected() {
        assert!(classify("Alumahan (Indian Mackerel)").is_none());
        assert!(classify("Some random text").is_none());
    }

    #[test]
    fn vocabulary_fully_canonicalized() {
        for header in HEADER_VOCABULARY {
            assert!(
                CANONICAL_NAMES.contains_key(header),
                "no canonical entry for {:?}",
                header
            );
        }
    }
}
