//! Region Locator CLI
//!
//! Runs one region query against an evidence store snapshot.
//!
//! Usage:
//!   locate-region --store data/evidence_store.json \
//!                 --query data/query.json \
//!                 --output results.json

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use region_locator::{loader, RegionAggregator, RegionCatalog, ScoreConfig, TracingSink};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "locate-region",
    about = "Infer the most likely region for a cell/WiFi/Bluetooth query"
)]
struct Args {
    /// Path to evidence store snapshot JSON file
    #[arg(short, long, default_value = "data/evidence_store.json")]
    store: PathBuf,

    /// Path to query JSON file
    #[arg(short, long, default_value = "data/query.json")]
    query: PathBuf,

    /// MCC catalog JSON file (built-in table if omitted)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Score configuration JSON file (built-in defaults if omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Evaluation time, RFC 3339 (current time if omitted)
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    /// Output JSON file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let catalog = match &args.catalog {
        Some(path) => loader::load_catalog(path)?,
        None => RegionCatalog::with_defaults(),
    };
    let config = match &args.config {
        Some(path) => loader::load_config(path)?,
        None => ScoreConfig::default(),
    };
    let store = loader::load_store_snapshot(&args.store)?;
    let query = loader::load_query(&args.query)?;

    let aggregator = RegionAggregator::new(Arc::new(catalog), store).with_config(config);
    info!(
        "Catalog: {} MCCs, station half-life {} days, area half-life {} days",
        aggregator.catalog().len(),
        aggregator.config().station_half_life_days,
        aggregator.config().area_half_life_days
    );

    let now = args.now.unwrap_or_else(Utc::now);
    let results = aggregator.search_and_record(&query, now, &TracingSink)?;

    match results.best() {
        Some(best) => info!(
            "Best region: {} ({}) score={:.3} accuracy={}",
            best.region_code,
            best.region_name,
            best.score,
            results.accuracy().as_str()
        ),
        None => info!("No region found"),
    }
    for r in results.iter().take(10) {
        info!(
            "  {:.3} | {} | {:30.30} | evidence={} (areas={} stations={})",
            r.score,
            r.region_code,
            r.region_name,
            r.evidence_count(),
            r.area_contributions,
            r.station_contributions
        );
    }

    let json = results.to_json();
    match &args.output {
        Some(path) => {
            info!("Writing output to {:?}", path);
            let file = File::create(path)?;
            serde_json::to_writer_pretty(BufWriter::new(file), &json)?;
        }
        None => {
            serde_json::to_writer_pretty(io::stdout().lock(), &json)?;
            println!();
        }
    }

    Ok(())
}
