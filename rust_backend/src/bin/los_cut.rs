//! Loss-of-signal cut planner
//!
//! Detects marker dropouts in exported tracking data, correlates them with the
//! recorded media files and writes one render job per cut as JSON lines.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin los-cut -- \
//!     --samples data/tracking --media data/media.json --output cuts.jsonl
//! ```
//!
//! # Environment Variables
//!
//! - `LOS_CONFIG`: Configuration file (default: `los.toml` in the standard locations)
//! - `LOS_SAMPLES`, `LOS_MEDIA`, `LOS_ANNOTATIONS`, `LOS_OUTPUT`: same as the flags
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use los_rust::config::AnalysisConfig;
use los_rust::io::loaders::{CsvSampleSource, JsonLinesSink, ManifestMetadataSource};
use los_rust::parsing::annotations::parse_annotations_file;
use los_rust::parsing::tracking_csv::TrackingColumns;
use los_rust::services::{AnalysisRunner, DropoutPipeline};

/// Plan video cuts around tracking-marker dropouts
#[derive(Parser, Debug)]
#[command(name = "los-cut", author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "LOS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of tracking CSV exports, one per recording
    #[arg(long, env = "LOS_SAMPLES")]
    samples: PathBuf,

    /// Media metadata manifest (JSON)
    #[arg(long, env = "LOS_MEDIA")]
    media: PathBuf,

    /// Operator log steps (JSON) used to annotate cuts
    #[arg(long, env = "LOS_ANNOTATIONS")]
    annotations: Option<PathBuf>,

    /// Output file for render jobs (JSON lines)
    #[arg(short, long, env = "LOS_OUTPUT")]
    output: PathBuf,

    /// Optional file for the full run report (JSON)
    #[arg(long)]
    report: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => match AnalysisConfig::from_default_location() {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("{}; using built-in defaults", e);
                Ok(AnalysisConfig::default())
            }
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    info!("Starting los-cut");

    let config = load_config(args.config.as_ref())?;
    let pipeline = DropoutPipeline::new(&config).context("Invalid configuration")?;

    let samples = CsvSampleSource::new(&args.samples, TrackingColumns::from(&config.tracking));
    let media = ManifestMetadataSource::from_file(&args.media)
        .with_context(|| format!("Failed to read media manifest {}", args.media.display()))?;
    let sink = JsonLinesSink::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let mut runner = AnalysisRunner::new(pipeline, Arc::new(samples), Arc::new(media), Arc::new(sink));
    if let Some(path) = &args.annotations {
        let steps = parse_annotations_file(path)
            .with_context(|| format!("Failed to read annotations {}", path.display()))?;
        info!("Loaded {} annotation step(s)", steps.steps().len());
        runner = runner.with_annotations(steps);
    }

    let report = runner.run().await.context("Analysis run failed")?;

    if let Some(average) = report.average_missing_percentage {
        info!("Average missing-marker percentage: {:.2}%", average);
    }
    info!(
        "Wrote {} render job(s) to {}",
        report.jobs_submitted,
        args.output.display()
    );
    if report.failure_count() > 0 {
        warn!("{} input(s) could not be processed", report.failure_count());
    }

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Run report written to {}", path.display());
    }

    Ok(())
}
