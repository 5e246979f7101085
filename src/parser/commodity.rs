use std::sync::LazyLock;

use regex::Regex;

/// One successfully tokenized data row.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedLine {
    pub name: String,
    pub specification: String,
    pub price: f64,
}

// Table headers, footers, and explicit not-applicable rows.
const NOISE_MARKERS: &[&str] = &[
    "COMMODITY",
    "SPECIFICATION",
    "RETAIL PRICE",
    "PRICE",
    "UNIT",
    "Page ",
    "n/a",
];

// Trailing price: digits, a point, exactly two decimals, end of line.
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+\.\d{2})\s*$").unwrap());

// Name/specification split patterns, most specific first. The documents are
// typeset inconsistently (the specification sometimes precedes, sometimes
// follows descriptive qualifiers), so precedence is an explicit chain rather
// than one regex relying on backtracking.

// "Alumahan (Indian Mackerel) Medium (4-6 pcs/kg)": qualifier word through a
// closing parenthesis is the specification.
static QUALIFIER_PAREN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s+((?:Medium|Large|Small|Ripe|Fresh|Frozen|Male|Female).*\([^)]+\))$")
        .unwrap()
});

// "Tomato 15-18 pcs/kg": everything from the numeric range on.
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+?)\s+(\d+-\d+.*)$").unwrap());

// "Papaya Ripe": bare trailing qualifier with nothing after it.
static BARE_QUALIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+(Medium|Large|Small|Ripe|Fresh|Frozen)$").unwrap());

// Name runs through the first parenthesized group, remainder is the
// specification.
static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+?\([^)]+\))\s+(.+)$").unwrap());

type Matcher = fn(&str) -> Option<(String, String)>;

/// First structural match wins, deterministically.
const SPLIT_CHAIN: &[Matcher] = &[
    qualifier_with_parens,
    numeric_range,
    bare_qualifier,
    after_first_parens,
];

/// Tokenize one data row into name, optional specification, and price.
///
/// Returns `None` for noise (table headers, page footers, "n/a" rows) and
/// for rows without a parseable positive trailing price. Pure function of
/// the line; never errors.
pub fn tokenize(line: &str) -> Option<TokenizedLine> {
    if NOISE_MARKERS.iter().any(|marker| line.contains(marker)) {
        return None;
    }

    let caps = PRICE_RE.captures(line)?;
    let price: f64 = caps[1].parse().ok()?;
    if price <= 0.0 {
        return None;
    }
    let remainder = line[..caps.get(1).unwrap().start()].trim();
    if remainder.is_empty() {
        return None; // a price with no commodity name is not an observation
    }

    for matcher in SPLIT_CHAIN {
        if let Some((name, specification)) = matcher(remainder) {
            return Some(TokenizedLine {
                name,
                specification,
                price,
            });
        }
    }

    // No structural pattern matched: the whole remainder is the name.
    Some(TokenizedLine {
        name: remainder.to_string(),
        specification: String::new(),
        price,
    })
}

fn split_with(re: &Regex, remainder: &str) -> Option<(String, String)> {
    re.captures(remainder)
        .map(|caps| (caps[1].trim().to_string(), caps[2].trim().to_string()))
}

fn qualifier_with_parens(remainder: &str) -> Option<(String, String)> {
    split_with(&QUALIFIER_PAREN_RE, remainder)
}

fn numeric_range(remainder: &str) -> Option<(String, String)> {
    split_with(&RANGE_RE, remainder)
}

fn bare_qualifier(remainder: &str) -> Option<(String, String)> {
    split_with(&BARE_QUALIFIER_RE, remainder)
}

fn after_first_parens(remainder: &str) -> Option<(String, String)> {
    split_with(&PAREN_RE, remainder)
}
