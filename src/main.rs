//! Transaction Anomaly Report - CLI Entry Point
//!
//! Loads a transaction file, flags anomalous rows with an isolation forest
//! and writes the resulting incident report as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use transaction_anomaly_report::{
    config::{AppConfig, LoggingConfig},
    detector::FraudDetector,
    loader::DatasetLoader,
    metrics::DetectionMetrics,
    types::{Dataset, IncidentReport},
};

/// Hint shown when a file cannot be analysed
const SUPPORTED_COLUMNS_HINT: &str =
    "Required columns: Transaction amount, date, and at least one entity identifier";

#[derive(Parser, Debug)]
#[command(name = "fraud-report", about = "Flag anomalous transactions and build an incident report")]
struct Args {
    /// Transaction file (.csv or .json)
    input: PathBuf,

    /// Configuration file
    #[arg(long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Write the report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write the input rows with anomaly_score and anomaly columns as CSV
    #[arg(long)]
    annotated: Option<PathBuf>,

    /// Override the forest seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the expected outlier fraction
    #[arg(long)]
    contamination: Option<f64>,
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        format!("transaction_anomaly_report={}", logging.level).parse()?,
    );

    // Reports go to stdout, logs to stderr
    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        AppConfig::load_from_path(path)
    } else {
        Ok(AppConfig::default())
    }
}

fn write_report(report: &IncidentReport, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}

fn write_annotated(dataset: &Dataset, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(dataset.columns())?;
    for row in dataset.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn run(args: &Args, config: AppConfig, metrics: Arc<DetectionMetrics>) -> Result<()> {
    let loader = DatasetLoader::new(&config.input);
    let dataset = loader.load(&args.input)?;

    let detector = FraudDetector::new(&config)?.with_metrics(metrics);

    let result = detector.detect(&dataset)?;
    if let Some(path) = &args.annotated {
        write_annotated(&result.annotate(&dataset)?, path)?;
        info!(path = %path.display(), "Annotated dataset written");
    }

    let recommendations = detector.recommend(&result.fraud_types);
    let summary = detector.summarize(&dataset, &result)?;
    let report = IncidentReport::new(dataset.len(), result, recommendations, summary);

    info!(
        report_id = %report.report_id,
        fraud_types = ?report.fraud_types,
        suspicious = report.suspicious_rows.len(),
        "Incident report ready"
    );

    write_report(&report, args.output.as_deref())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(seed) = args.seed {
        config.detection.seed = seed;
    }
    if let Some(contamination) = args.contamination {
        config.detection.contamination = contamination;
    }

    init_logging(&config.logging)?;
    info!("Starting Transaction Anomaly Report");

    let metrics = Arc::new(DetectionMetrics::new());

    if let Err(e) = run(&args, config, metrics.clone()) {
        error!(error = %e, "Analysis failed");
        eprintln!("Error: {:#}", e);
        eprintln!("{}", SUPPORTED_COLUMNS_HINT);
        std::process::exit(1);
    }

    metrics.print_summary();
    Ok(())
}
