//! `arxiv-harvest` command line entry point

use arxiv_harvest::{HarvestConfig, HarvestStatus, HttpTransport, JsonFileStore, TokioSleeper};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Harvest recent arXiv metadata into a rolling JSON snapshot
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file; defaults apply to every missing key
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot file to read and rewrite
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Category to keep, e.g. `cs.AI` (repeatable; replaces the configured list)
    #[arg(long = "category", value_name = "CODE")]
    categories: Vec<String>,

    /// Days of publications to keep in the snapshot
    #[arg(long)]
    retention_days: Option<u32>,

    /// How far back to look when the snapshot is empty
    #[arg(long)]
    lookback_days: Option<u32>,
}

impl Args {
    fn into_config(self) -> arxiv_harvest::Result<HarvestConfig> {
        let mut config = match &self.config {
            Some(path) => HarvestConfig::from_file(path)?,
            None => HarvestConfig::default(),
        };

        if let Some(output) = self.output {
            config.output_path = output;
        }
        if !self.categories.is_empty() {
            config.categories = self.categories;
        }
        if let Some(days) = self.retention_days {
            config.retention_days = days;
        }
        if let Some(days) = self.lookback_days {
            config.default_lookback_days = days;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let transport = match HttpTransport::new(&config.base_url, config.request_timeout) {
        Ok(transport) => transport,
        Err(e) => {
            tracing::error!(error = %e, "Could not create HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let output = config.output_path.clone();
    let store = JsonFileStore::new(&output);
    let today = chrono::Utc::now().date_naive();

    match arxiv_harvest::run(config, transport, store, Arc::new(TokioSleeper), today).await {
        Ok(report) => {
            let status = match &report.status {
                HarvestStatus::Complete => "complete".to_string(),
                HarvestStatus::NoRecords => "no new records".to_string(),
                HarvestStatus::Aborted { reason } => format!("partial ({reason})"),
            };
            println!(
                "{} to {}: {} fetched, {} kept, {} pruned, harvest {} -> {}",
                report.window.start_date,
                report.window.end_date,
                report.stats.fetched,
                report.stats.after_prune,
                report.stats.pruned(),
                status,
                output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, path = %output.display(), "Failed to write snapshot");
            ExitCode::FAILURE
        }
    }
}
