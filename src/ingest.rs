use anyhow::{bail, Result};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::changes;
use crate::db;
use crate::parser::{self, Observation};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub name: String,
    pub old_price: f64,
    pub new_price: f64,
    pub change_percentage: f64,
    pub is_increase: bool,
}

/// Per-document outcome handed back to the caller. `saved` can fall short of
/// `total_commodities`; the gap is explained by `diagnostics`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub date: String,
    pub total_commodities: usize,
    pub saved: usize,
    pub price_changes: Vec<ChangeSummary>,
    pub diagnostics: Vec<String>,
}

/// Parse one extracted report and persist it: upsert commodity identity and
/// the day's price row, then compare against the prior history.
///
/// A missing date stamp rejects the whole document before anything is
/// persisted. After that, failures are isolated per commodity: one bad row
/// never aborts the rest, it becomes a diagnostic and a reduced count.
pub fn ingest_document(conn: &Connection, text: &str, threshold: f64) -> Result<IngestSummary> {
    let doc = parser::process_document(text)?;
    let date = doc.date.format("%Y-%m-%d").to_string();
    info!(
        date = %date,
        commodities = doc.commodities.len(),
        "document parsed"
    );

    let mut summary = IngestSummary {
        date: date.clone(),
        total_commodities: doc.commodities.len(),
        saved: 0,
        price_changes: Vec::new(),
        diagnostics: Vec::new(),
    };

    for obs in &doc.commodities {
        if let Err(e) = save_observation(conn, obs, &date, threshold, &mut summary) {
            warn!(commodity = %obs.name, "skipped: {}", e);
            summary.diagnostics.push(format!("{}: {}", obs.name, e));
        }
    }

    info!(
        saved = summary.saved,
        changes = summary.price_changes.len(),
        "document persisted"
    );
    Ok(summary)
}

fn save_observation(
    conn: &Connection,
    obs: &Observation,
    date: &str,
    threshold: f64,
    summary: &mut IngestSummary,
) -> Result<()> {
    let Some(category_id) = db::category_id(conn, &obs.category)? else {
        bail!("no category match for {:?}", obs.category);
    };
    let commodity_id =
        db::find_or_create_commodity(conn, &obs.name, &obs.specification, category_id, obs.unit)?;

    // Point-in-time read strictly before this report's date, taken against
    // the same connection that writes the new row.
    let prior = db::latest_price_before(conn, commodity_id, date)?;
    db::upsert_price(conn, commodity_id, obs.price, date)?;
    summary.saved += 1;

    // Change detection is best-effort; it must never block the price row.
    match changes::evaluate(prior, obs.price, threshold) {
        Ok(Some(change)) => {
            if let Err(e) = db::insert_price_change(conn, commodity_id, &change, date) {
                warn!(commodity = %obs.name, "change not recorded: {}", e);
                summary
                    .diagnostics
                    .push(format!("{}: change not recorded: {}", obs.name, e));
            } else {
                summary.price_changes.push(ChangeSummary {
                    name: obs.name.clone(),
                    old_price: change.old_price,
                    new_price: change.new_price,
                    change_percentage: change.change_percentage,
                    is_increase: change.is_increase,
                });
            }
        }
        Ok(None) => {}
        Err(e) => {
            warn!(commodity = %obs.name, "change detection failed: {}", e);
            summary
                .diagnostics
                .push(format!("{}: change detection failed: {}", obs.name, e));
        }
    }
    Ok(())
}
