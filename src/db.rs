use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use crate::changes::PriceChange;
use crate::parser::category;

const DB_PATH: &str = "data/prices.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS categories (
            id         INTEGER PRIMARY KEY,
            name       TEXT UNIQUE NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS commodities (
            id            INTEGER PRIMARY KEY,
            name          TEXT NOT NULL,
            specification TEXT NOT NULL DEFAULT '',
            category_id   INTEGER NOT NULL REFERENCES categories(id),
            unit          TEXT NOT NULL DEFAULT 'kg',
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(name, specification, category_id)
        );
        CREATE INDEX IF NOT EXISTS idx_commodities_category ON commodities(category_id);

        CREATE TABLE IF NOT EXISTS price_history (
            id           INTEGER PRIMARY KEY,
            commodity_id INTEGER NOT NULL REFERENCES commodities(id),
            price        REAL NOT NULL,
            date         TEXT NOT NULL,
            recorded_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(commodity_id, date)
        );
        CREATE INDEX IF NOT EXISTS idx_history_date ON price_history(date);

        CREATE TABLE IF NOT EXISTS price_changes (
            id                INTEGER PRIMARY KEY,
            commodity_id      INTEGER NOT NULL REFERENCES commodities(id),
            old_price         REAL NOT NULL,
            new_price         REAL NOT NULL,
            change_amount     REAL NOT NULL,
            change_percentage REAL NOT NULL,
            change_date       TEXT NOT NULL,
            is_increase       BOOLEAN NOT NULL,
            UNIQUE(commodity_id, change_date)
        );
        CREATE INDEX IF NOT EXISTS idx_changes_date ON price_changes(change_date);
        ",
    )?;
    seed_categories(conn)?;
    Ok(())
}

/// The closed category vocabulary is authoritative; persistence carries
/// exactly the canonical names and nothing else.
fn seed_categories(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO categories (name) VALUES (?1)")?;
        for name in category::canonical_names() {
            stmt.execute([name])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Ingestion ──

/// Exact (case-insensitive) category resolution. No fuzzy fallback: a miss
/// surfaces as a per-commodity diagnostic upstream.
pub fn category_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM categories WHERE UPPER(name) = UPPER(?1)",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Commodity identity is (name, specification, category); the same name may
/// legitimately recur across categories.
pub fn find_or_create_commodity(
    conn: &Connection,
    name: &str,
    specification: &str,
    category_id: i64,
    unit: &str,
) -> Result<i64> {
    if let Some(id) = conn
        .query_row(
            "SELECT id FROM commodities
             WHERE name = ?1 AND specification = ?2 AND category_id = ?3",
            rusqlite::params![name, specification, category_id],
            |row| row.get(0),
        )
        .optional()?
    {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO commodities (name, specification, category_id, unit)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![name, specification, category_id, unit],
    )?;
    Ok(conn.last_insert_rowid())
}

/// One price row per (commodity, date); re-ingesting the same report
/// overwrites (last write wins).
pub fn upsert_price(conn: &Connection, commodity_id: i64, price: f64, date: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO price_history (commodity_id, price, date) VALUES (?1, ?2, ?3)
         ON CONFLICT(commodity_id, date) DO UPDATE SET price = excluded.price",
        rusqlite::params![commodity_id, price, date],
    )?;
    Ok(())
}

/// Most recent recorded price strictly before `date`.
pub fn latest_price_before(
    conn: &Connection,
    commodity_id: i64,
    date: &str,
) -> Result<Option<f64>> {
    let price = conn
        .query_row(
            "SELECT price FROM price_history
             WHERE commodity_id = ?1 AND date < ?2
             ORDER BY date DESC
             LIMIT 1",
            rusqlite::params![commodity_id, date],
            |row| row.get(0),
        )
        .optional()?;
    Ok(price)
}

/// One change row per (commodity, date); re-ingesting a report replaces the
/// row instead of appending a duplicate, matching the price upsert.
pub fn insert_price_change(
    conn: &Connection,
    commodity_id: i64,
    change: &PriceChange,
    date: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO price_changes
         (commodity_id, old_price, new_price, change_amount, change_percentage, change_date, is_increase)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(commodity_id, change_date) DO UPDATE SET
             old_price = excluded.old_price,
             new_price = excluded.new_price,
             change_amount = excluded.change_amount,
             change_percentage = excluded.change_percentage,
             is_increase = excluded.is_increase",
        rusqlite::params![
            commodity_id,
            change.old_price,
            change.new_price,
            change.change_amount,
            change.change_percentage,
            date,
            change.is_increase,
        ],
    )?;
    Ok(())
}

// ── Reporting ──

pub struct CommodityRow {
    pub id: i64,
    pub name: String,
    pub specification: String,
    pub unit: String,
    pub category_name: String,
    pub latest_price: Option<f64>,
    pub price_date: Option<String>,
}

pub fn list_commodities(
    conn: &Connection,
    category: Option<&str>,
    search: Option<&str>,
    limit: usize,
) -> Result<Vec<CommodityRow>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(cat) = category {
        conditions.push(format!("UPPER(c.name) = UPPER(?{})", params.len() + 1));
        params.push(Box::new(cat.to_string()));
    }
    if let Some(s) = search {
        conditions.push(format!(
            "(co.name LIKE ?{n} OR co.specification LIKE ?{n})",
            n = params.len() + 1
        ));
        params.push(Box::new(format!("%{}%", s)));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT co.id, co.name, co.specification, co.unit, c.name,
                (SELECT price FROM price_history ph
                 WHERE ph.commodity_id = co.id ORDER BY ph.date DESC LIMIT 1),
                (SELECT date FROM price_history ph
                 WHERE ph.commodity_id = co.id ORDER BY ph.date DESC LIMIT 1)
         FROM commodities co
         JOIN categories c ON co.category_id = c.id{}
         ORDER BY c.name, co.name
         LIMIT {}",
        where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(CommodityRow {
                id: row.get(0)?,
                name: row.get(1)?,
                specification: row.get(2)?,
                unit: row.get(3)?,
                category_name: row.get(4)?,
                latest_price: row.get(5)?,
                price_date: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// First commodity whose name or specification matches the search text.
pub fn find_commodity(conn: &Connection, search: &str) -> Result<Option<(i64, String, String)>> {
    let pattern = format!("%{}%", search);
    let hit = conn
        .query_row(
            "SELECT id, name, specification FROM commodities
             WHERE name LIKE ?1 OR specification LIKE ?1
             ORDER BY name
             LIMIT 1",
            [&pattern],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    Ok(hit)
}

pub struct HistoryRow {
    pub date: String,
    pub price: f64,
}

pub fn price_history(conn: &Connection, commodity_id: i64, days: i64) -> Result<Vec<HistoryRow>> {
    let mut stmt = conn.prepare(
        "SELECT date, price FROM price_history
         WHERE commodity_id = ?1 AND date >= date('now', ?2)
         ORDER BY date DESC",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![commodity_id, format!("-{} days", days)],
            |row| {
                Ok(HistoryRow {
                    date: row.get(0)?,
                    price: row.get(1)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct ChangeRow {
    pub commodity_name: String,
    pub specification: String,
    pub category_name: String,
    pub old_price: f64,
    pub new_price: f64,
    pub change_percentage: f64,
    pub change_date: String,
    pub is_increase: bool,
}

/// Significant changes in the lookback window, largest moves first per day.
pub fn recent_changes(conn: &Connection, days: i64, min_percentage: f64) -> Result<Vec<ChangeRow>> {
    let mut stmt = conn.prepare(
        "SELECT co.name, co.specification, c.name,
                pc.old_price, pc.new_price, pc.change_percentage,
                pc.change_date, pc.is_increase
         FROM price_changes pc
         JOIN commodities co ON pc.commodity_id = co.id
         JOIN categories c ON co.category_id = c.id
         WHERE pc.change_date >= date('now', ?1)
           AND ABS(pc.change_percentage) >= ?2
         ORDER BY pc.change_date DESC, ABS(pc.change_percentage) DESC
         LIMIT 50",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![format!("-{} days", days), min_percentage],
            |row| {
                Ok(ChangeRow {
                    commodity_name: row.get(0)?,
                    specification: row.get(1)?,
                    category_name: row.get(2)?,
                    old_price: row.get(3)?,
                    new_price: row.get(4)?,
                    change_percentage: row.get(5)?,
                    change_date: row.get(6)?,
                    is_increase: row.get(7)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct CategoryRow {
    pub name: String,
    pub commodity_count: i64,
}

pub fn list_categories(conn: &Connection) -> Result<Vec<CategoryRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.name, COUNT(co.id)
         FROM categories c
         LEFT JOIN commodities co ON co.category_id = c.id
         GROUP BY c.id, c.name
         ORDER BY c.name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CategoryRow {
                name: row.get(0)?,
                commodity_count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub categories: usize,
    pub commodities: usize,
    pub price_rows: usize,
    pub changes: usize,
    pub latest_date: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let categories: usize = conn.query_row("SELECT COUNT(*) FROM categories", [], |r| r.get(0))?;
    let commodities: usize =
        conn.query_row("SELECT COUNT(*) FROM commodities", [], |r| r.get(0))?;
    let price_rows: usize =
        conn.query_row("SELECT COUNT(*) FROM price_history", [], |r| r.get(0))?;
    let changes: usize =
        conn.query_row("SELECT COUNT(*) FROM price_changes", [], |r| r.get(0))?;
    let latest_date: Option<String> =
        conn.query_row("SELECT MAX(date) FROM price_history", [], |r| r.get(0))?;
    Ok(Stats {
        categories,
        commodities,
        price_rows,
        changes,
        latest_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn schema_seeds_all_categories() {
        let conn = test_conn();
        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.categories, 12);
        assert!(category_id(&conn, "Fish Products").unwrap().is_some());
        // Uppercase header form resolves to the same row.
        assert_eq!(
            category_id(&conn, "FISH PRODUCTS").unwrap(),
            category_id(&conn, "Fish Products").unwrap()
        );
    }

    #[test]
    fn init_schema_is_idempotent() {
        let conn = test_conn();
        init_schema(&conn).unwrap();
        assert_eq!(get_stats(&conn).unwrap().categories, 12);
    }

    #[test]
    fn unknown_category_misses() {
        let conn = test_conn();
        assert!(category_id(&conn, "SEAFOOD").unwrap().is_none());
    }

    #[test]
    fn commodity_identity_includes_category() {
        let conn = test_conn();
        let fish = category_id(&conn, "Fish Products").unwrap().unwrap();
        let veg = category_id(&conn, "Lowland Vegetables").unwrap().unwrap();

        let a = find_or_create_commodity(&conn, "Tomato", "", fish, "kg").unwrap();
        let b = find_or_create_commodity(&conn, "Tomato", "", veg, "kg").unwrap();
        let c = find_or_create_commodity(&conn, "Tomato", "", fish, "kg").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn upsert_price_last_write_wins() {
        let conn = test_conn();
        let cat = category_id(&conn, "Fruits").unwrap().unwrap();
        let id = find_or_create_commodity(&conn, "Papaya", "Ripe", cat, "kg").unwrap();

        upsert_price(&conn, id, 76.12, "2025-10-07").unwrap();
        upsert_price(&conn, id, 80.00, "2025-10-07").unwrap();

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.price_rows, 1);
        let latest = latest_price_before(&conn, id, "2025-10-08").unwrap();
        assert_eq!(latest, Some(80.00));
    }

    #[test]
    fn prior_price_is_strictly_before() {
        let conn = test_conn();
        let cat = category_id(&conn, "Spices").unwrap().unwrap();
        let id = find_or_create_commodity(&conn, "Red Onion", "", cat, "kg").unwrap();

        upsert_price(&conn, id, 100.00, "2025-10-06").unwrap();
        upsert_price(&conn, id, 110.00, "2025-10-07").unwrap();

        // The same-day row must not be visible to change detection.
        assert_eq!(
            latest_price_before(&conn, id, "2025-10-07").unwrap(),
            Some(100.00)
        );
        assert_eq!(latest_price_before(&conn, id, "2025-10-06").unwrap(), None);
    }

    #[test]
    fn price_change_upsert_last_write_wins() {
        let conn = test_conn();
        let cat = category_id(&conn, "Fish Products").unwrap().unwrap();
        let id = find_or_create_commodity(&conn, "Tilapia", "Medium", cat, "kg").unwrap();

        let first = PriceChange {
            old_price: 100.00,
            new_price: 110.00,
            change_amount: 10.00,
            change_percentage: 10.00,
            is_increase: true,
        };
        let second = PriceChange {
            old_price: 100.00,
            new_price: 92.00,
            change_amount: -8.00,
            change_percentage: -8.00,
            is_increase: false,
        };
        insert_price_change(&conn, id, &first, "2025-10-07").unwrap();
        insert_price_change(&conn, id, &second, "2025-10-07").unwrap();

        assert_eq!(get_stats(&conn).unwrap().changes, 1);
        let rows = recent_changes(&conn, 36500, 0.0).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].new_price, 92.00);
        assert!(!rows[0].is_increase);
    }

    #[test]
    fn list_commodities_with_latest_price() {
        let conn = test_conn();
        let cat = category_id(&conn, "Fruits").unwrap().unwrap();
        let id =
            find_or_create_commodity(&conn, "Banana (Lakatan)", "8-10 pcs/kg", cat, "kg").unwrap();
        upsert_price(&conn, id, 98.07, "2025-10-06").unwrap();
        upsert_price(&conn, id, 99.50, "2025-10-07").unwrap();

        let rows = list_commodities(&conn, Some("Fruits"), None, 50).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].latest_price, Some(99.50));
        assert_eq!(rows[0].price_date.as_deref(), Some("2025-10-07"));

        let by_search = list_commodities(&conn, None, Some("Lakatan"), 50).unwrap();
        assert_eq!(by_search.len(), 1);
        assert!(list_commodities(&conn, Some("Spices"), None, 50)
            .unwrap()
            .is_empty());
    }
}
