use std::path::Path;
use std::process::ExitCode;

use quakesplit::config::{SplitConfig, DEFAULT_CONFIG_FILE};
use quakesplit::pipeline::{self, RunOutcome};
use quakesplit::CancelFlag;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let result = SplitConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))
        .and_then(|config| pipeline::run(&config, CancelFlag::new()));

    match result {
        Ok(outcome) => {
            if let RunOutcome::Split(report) = &outcome {
                tracing::info!(
                    "Split {} rows into {} earthquake(s) at {}",
                    report.rows_read,
                    report.segments,
                    report.finished_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            tracing::info!("{}", outcome.stats().global.report("Global"));
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(e.code())
        }
    }
}
