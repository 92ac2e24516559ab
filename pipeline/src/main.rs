use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use intake_pipeline::{Dispatcher, PersonAnonymizer, PipelineConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Watch an upload directory and process every JSON file dropped into it.
#[derive(Debug, Parser)]
#[command(name = "intake", version)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Root directory for relative pipeline directories.
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Replace personal data in the output with placeholders.
    #[arg(long)]
    anonymize: bool,

    /// Interval between upload directory polls, in milliseconds.
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Maximum number of files processed at once.
    #[arg(long)]
    max_concurrent_runs: Option<usize>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(work_dir) = self.work_dir {
            config.work_dir = work_dir;
        }
        if self.anonymize {
            config.anonymize = true;
        }
        if let Some(ms) = self.poll_interval_ms {
            config = config.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(max) = self.max_concurrent_runs {
            config = config.with_max_concurrent_runs(max);
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;
    let directories = config
        .ensure_directories()
        .await
        .context("failed to create pipeline directories")?;
    info!(
        upload = %directories.upload.display(),
        output = %directories.output.display(),
        error = %directories.error.display(),
        anonymize = config.anonymize,
        "Starting intake pipeline"
    );

    let dispatcher = Arc::new(Dispatcher::new(config, Arc::new(PersonAnonymizer::new()))?);
    let handle = dispatcher.clone().start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown requested");
    handle.shutdown().await?;

    let stats = dispatcher.stats();
    info!(
        completed = stats.completed,
        failed = stats.failed,
        abandoned = stats.abandoned,
        "Intake pipeline stopped"
    );
    Ok(())
}
