//! Run command implementation.

use crate::backend;
use crate::config::Config;
use crate::daemon::Daemon;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the run command
#[derive(Args)]
pub struct RunArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "drive-sentry.toml")]
    pub config: PathBuf,
}

/// Run the watchdog loop
pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = Config::load(&args.config)?;
    announce(&config);
    backend::report_tool_availability();

    Daemon::new(config).run().await?;
    Ok(())
}

fn announce(config: &Config) {
    info!("=== configuration loaded ===");
    info!("volume label: {}", config.volume_label);
    info!("scan interval: {}s", config.scan_interval_secs);
    for pair in &config.pairs {
        info!(
            "pair: {} -> {}",
            pair.source.display(),
            pair.destination.display()
        );
    }
}
