mod changes;
mod db;
mod extract;
mod ingest;
mod parser;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dpi_tracker", about = "Daily Price Index commodity tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema and seed the category vocabulary
    Init,
    /// Parse one or more extracted reports (.pdf or .txt) and record prices
    Ingest {
        /// Report files to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Minimum absolute percentage move recorded as a price change
        #[arg(short, long, default_value_t = changes::DEFAULT_THRESHOLD)]
        threshold: f64,
        /// Emit per-document summaries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Commodities with their latest recorded price
    Overview {
        /// Filter by canonical category name (e.g. "Fish Products")
        #[arg(short, long)]
        category: Option<String>,
        /// Search by commodity name or specification
        #[arg(short, long)]
        search: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Recent significant price changes
    Changes {
        /// Lookback window in days
        #[arg(short, long, default_value = "7")]
        days: i64,
        /// Minimum absolute percentage change to show
        #[arg(short, long, default_value = "5.0")]
        min_percentage: f64,
    },
    /// Price history for the first commodity matching a search
    History {
        /// Commodity name or specification fragment
        search: String,
        /// Lookback window in days
        #[arg(short, long, default_value = "30")]
        days: i64,
    },
    /// Canonical categories with commodity counts
    Categories,
    /// Database statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            println!(
                "Schema ready, {} categories seeded.",
                db::get_stats(&conn)?.categories
            );
            Ok(())
        }
        Commands::Ingest {
            paths,
            threshold,
            json,
        } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            run_ingest(&conn, &paths, threshold, json)
        }
        Commands::Overview {
            category,
            search,
            limit,
        } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::list_commodities(&conn, category.as_deref(), search.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No commodities found. Run 'ingest' first.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<32} | {:<22} | {:<24} | {:>9} | {:<10}",
                "#", "Commodity", "Specification", "Category", "Price", "As of"
            );
            println!("{}", "-".repeat(115));
            for (i, r) in rows.iter().enumerate() {
                let price = r
                    .latest_price
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| "-".into());
                let as_of = r.price_date.as_deref().unwrap_or("-");
                println!(
                    "{:>3} | {:<32} | {:<22} | {:<24} | {:>9} | {:<10}",
                    i + 1,
                    truncate(&r.name, 32),
                    truncate(&r.specification, 22),
                    truncate(&r.category_name, 24),
                    price,
                    as_of
                );
            }
            println!("\n{} commodities (prices per {})", rows.len(), parser::UNIT);
            Ok(())
        }
        Commands::Changes {
            days,
            min_percentage,
        } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::recent_changes(&conn, days, min_percentage)?;
            if rows.is_empty() {
                println!(
                    "No price changes of {:.1}%+ in the last {} days.",
                    min_percentage, days
                );
                return Ok(());
            }

            println!(
                "{:<10} | {:<32} | {:<24} | {:>9} | {:>9} | {:>8}",
                "Date", "Commodity", "Category", "Old", "New", "Change"
            );
            println!("{}", "-".repeat(105));
            for r in &rows {
                println!(
                    "{:<10} | {:<32} | {:<24} | {:>9.2} | {:>9.2} | {:>+7.2}%",
                    r.change_date,
                    truncate(&r.commodity_name, 32),
                    truncate(&r.category_name, 24),
                    r.old_price,
                    r.new_price,
                    r.change_percentage
                );
            }
            println!("\n{} changes", rows.len());
            Ok(())
        }
        Commands::History { search, days } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let Some((id, name, spec)) = db::find_commodity(&conn, &search)? else {
                println!("No commodity matches {:?}.", search);
                return Ok(());
            };
            let rows = db::price_history(&conn, id, days)?;
            if spec.is_empty() {
                println!("{} — last {} days", name, days);
            } else {
                println!("{} ({}) — last {} days", name, spec, days);
            }
            if rows.is_empty() {
                println!("No prices recorded in the window.");
                return Ok(());
            }
            for r in &rows {
                println!("  {}  {:>9.2}", r.date, r.price);
            }
            Ok(())
        }
        Commands::Categories => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::list_categories(&conn)?;
            for r in &rows {
                println!("{:<32} {:>4}", r.name, r.commodity_count);
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Categories:    {}", s.categories);
            println!("Commodities:   {}", s.commodities);
            println!("Price rows:    {}", s.price_rows);
            println!("Price changes: {}", s.changes);
            println!(
                "Latest report: {}",
                s.latest_date.as_deref().unwrap_or("none")
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Extract every file up front in parallel (PDF extraction dominates), then
/// persist sequentially in input order on the single connection.
fn run_ingest(
    conn: &rusqlite::Connection,
    paths: &[PathBuf],
    threshold: f64,
    json: bool,
) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = if paths.len() > 1 {
        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len}")?
                .progress_chars("=> "),
        );
        Some(pb)
    } else {
        None
    };

    let texts: Vec<(&PathBuf, anyhow::Result<String>)> = paths
        .par_iter()
        .map(|path| {
            let text = extract::read_document(path);
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            (path, text)
        })
        .collect();
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let mut failed = 0usize;
    for (path, text) in texts {
        let summary = match text.and_then(|t| ingest::ingest_document(conn, &t, threshold)) {
            Ok(summary) => summary,
            Err(e) => {
                eprintln!("{}: {:#}", path.display(), e);
                failed += 1;
                continue;
            }
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            continue;
        }

        println!(
            "{}: report {} — {} commodities, {} saved, {} price changes",
            path.display(),
            summary.date,
            summary.total_commodities,
            summary.saved,
            summary.price_changes.len()
        );
        for c in &summary.price_changes {
            println!(
                "  {:<36} {:>9.2} -> {:>9.2}  {:>+7.2}%",
                truncate(&c.name, 36),
                c.old_price,
                c.new_price,
                c.change_percentage
            );
        }
        for d in &summary.diagnostics {
            println!("  ! {}", d);
        }
    }

    if failed == paths.len() {
        anyhow::bail!("all {} documents failed to ingest", failed);
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
