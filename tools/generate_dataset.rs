//! Synthetic Transaction Dataset Generator
//!
//! Writes a CSV of ordinary transactions, optionally seeded with a
//! laundering spike and an embezzlement burst, for exercising `fraud-report`.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "generate-dataset", about = "Generate a synthetic transaction CSV")]
struct Args {
    /// Number of ordinary transactions
    #[arg(long, default_value_t = 200)]
    rows: usize,

    /// Seed for the generator
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Add a handful of very large transfers
    #[arg(long)]
    laundering: bool,

    /// Add a tight burst of transactions from one account
    #[arg(long)]
    embezzlement: bool,

    /// Output file (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

/// One CSV row, in the column layout the detector resolves by default
#[derive(Debug, Clone, Serialize)]
struct TransactionRecord {
    amount: f64,
    date: String,
    account: String,
}

/// Transaction generator for testing
struct TransactionGenerator {
    rng: StdRng,
    start: NaiveDateTime,
}

impl TransactionGenerator {
    fn new(seed: u64) -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self {
            rng: StdRng::seed_from_u64(seed),
            start,
        }
    }

    fn record(&self, amount: f64, at: NaiveDateTime, account: String) -> TransactionRecord {
        TransactionRecord {
            amount: (amount * 100.0).round() / 100.0,
            date: at.format("%Y-%m-%d %H:%M:%S").to_string(),
            account,
        }
    }

    /// Ordinary purchase: modest amount, any time within four weeks, one of many accounts
    fn generate_legitimate(&mut self) -> TransactionRecord {
        let amount = self.rng.gen_range(10.0..500.0);
        let offset = Duration::minutes(self.rng.gen_range(0..28 * 24 * 60));
        let account = format!("acct_{:04}", self.rng.gen_range(0..400));
        self.record(amount, self.start + offset, account)
    }

    /// Large transfers scattered over the period
    fn generate_laundering(&mut self, count: usize) -> Vec<TransactionRecord> {
        (0..count)
            .map(|_| {
                let amount = self.rng.gen_range(250_000.0..2_000_000.0);
                let offset = Duration::minutes(self.rng.gen_range(0..28 * 24 * 60));
                let account = format!("acct_{:04}", self.rng.gen_range(0..400));
                self.record(amount, self.start + offset, account)
            })
            .collect()
    }

    /// Small, repeated transactions from one account inside a single hour
    fn generate_embezzlement(&mut self, count: usize) -> Vec<TransactionRecord> {
        let burst_start = self.start + Duration::days(self.rng.gen_range(0..28)) + Duration::hours(3);
        (0..count)
            .map(|i| {
                let amount = self.rng.gen_range(45.0..55.0);
                let at = burst_start + Duration::minutes(i as i64 * 60 / count as i64);
                self.record(amount, at, "acct_insider".to_string())
            })
            .collect()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("generate_dataset=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut generator = TransactionGenerator::new(args.seed);

    let mut records: Vec<TransactionRecord> =
        (0..args.rows).map(|_| generator.generate_legitimate()).collect();

    let pattern_rows = (args.rows / 20).max(4);
    if args.laundering {
        records.extend(generator.generate_laundering(pattern_rows));
    }
    if args.embezzlement {
        records.extend(generator.generate_embezzlement(pattern_rows));
    }
    records.sort_by(|a, b| a.date.cmp(&b.date));

    let writer: Box<dyn io::Write> = match &args.output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in &records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;

    info!(
        rows = records.len(),
        laundering = args.laundering,
        embezzlement = args.embezzlement,
        seed = args.seed,
        "Dataset written"
    );

    Ok(())
}
