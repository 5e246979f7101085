pub mod category;
pub mod commodity;
pub mod date;
pub mod lines;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use tracing::debug;

/// Unit the source reports quote every retail price in.
pub const UNIT: &str = "kg";

/// One parsed (commodity, price) record under a recognized category.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub name: String,
    pub specification: String,
    pub price: f64,
    pub category: String,
    pub unit: &'static str,
}

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub date: NaiveDate,
    pub commodities: Vec<Observation>,
}

/// Walk one extracted report: date stamp first, then a single pass over the
/// lines carrying the active category.
///
/// A document without a locatable date stamp fails outright before any line
/// is processed. Lines before the first recognized header, rejected noise
/// rows, and rows without a trailing price are skipped silently.
pub fn process_document(text: &str) -> Result<ParsedDocument> {
    let Some(report_date) = date::extract_report_date(text) else {
        bail!("could not locate a report date stamp in the document");
    };

    let mut commodities = Vec::new();
    let mut current_category: Option<String> = None;

    for line in lines::split_lines(text) {
        if let Some(canonical) = category::classify(line) {
            debug!(category = %canonical, "section header");
            current_category = Some(canonical);
            continue;
        }
        let Some(active) = current_category.as_deref() else {
            continue; // preamble before the first section header
        };
        if let Some(row) = commodity::tokenize(line) {
            commodities.push(Observation {
                name: row.name,
                specification: row.specification,
                price: row.price,
                category: active.to_string(),
                unit: UNIT,
            });
        }
    }

    Ok(ParsedDocument {
        date: report_date,
        commodities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/ncr_2025_10_07.txt").unwrap()
    }

    #[test]
    fn fixture_date_and_counts() {
        let doc = process_document(&fixture()).unwrap();
        assert_eq!(doc.date.format("%Y-%m-%d").to_string(), "2025-10-07");
        assert_eq!(doc.commodities.len(), 10);
    }

    #[test]
    fn fixture_categories_assigned() {
        let doc = process_document(&fixture()).unwrap();
        let tomato = doc.commodities.iter().find(|c| c.name == "Tomato").unwrap();
        assert_eq!(tomato.category, "Lowland Vegetables");
        assert_eq!(tomato.specification, "15-18 pcs/kg");
        assert_eq!(tomato.unit, "kg");

        let alumahan = doc
            .commodities
            .iter()
            .find(|c| c.name == "Alumahan (Indian Mackerel)")
            .unwrap();
        assert_eq!(alumahan.category, "Fish Products");
        assert_eq!(alumahan.price, 342.72);
    }

    #[test]
    fn fixture_noise_excluded() {
        let doc = process_document(&fixture()).unwrap();
        assert!(doc.commodities.iter().all(|c| !c.name.contains("Page")));
        assert!(doc.commodities.iter().all(|c| !c.name.contains("n/a")));
        assert!(doc.commodities.iter().all(|c| c.price > 0.0));
    }

    #[test]
    fn missing_date_is_fatal() {
        let text = "DAILY PRICE INDEX\nFISH PRODUCTS\nTilapia Medium (5-6 pcs/kg) 152.30";
        let err = process_document(text).unwrap_err();
        assert!(err.to_string().contains("date"));
    }

    #[test]
    fn lines_before_first_header_skipped() {
        let text = "(Tuesday, October 7, 2025)\nTilapia Medium (5-6 pcs/kg) 152.30\nFISH PRODUCTS\nBangus Large (1-2 pcs) 287.55";
        let doc = process_document(text).unwrap();
        assert_eq!(doc.commodities.len(), 1);
        assert_eq!(doc.commodities[0].name, "Bangus");
    }

    #[test]
    fn no_headers_yields_empty_list() {
        let text = "(Tuesday, October 7, 2025)\nTilapia Medium (5-6 pcs/kg) 152.30";
        let doc = process_document(text).unwrap();
        assert!(doc.commodities.is_empty());
    }

    #[test]
    fn reparse_is_idempotent() {
        let text = fixture();
        let first = process_document(&text).unwrap();
        let second = process_document(&text).unwrap();
        assert_eq!(first.date, second.date);
        assert_eq!(first.commodities, second.commodities);
    }
}
