//! Check command implementation.

use crate::backend;
use crate::config::Config;
use crate::daemon::Daemon;
use crate::volume::{self, VolumeResolver};
use anyhow::bail;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the check command
#[derive(Args)]
pub struct CheckArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "drive-sentry.toml")]
    pub config: PathBuf,
}

/// Resolve the volume and run one sync pass, then exit.
/// Exits nonzero when the volume is not connected.
pub async fn run(args: CheckArgs) -> anyhow::Result<()> {
    let config = Config::load(&args.config)?;

    let resolver = VolumeResolver::new(config.volume_label.clone(), volume::platform_lister());
    let Some(mount) = resolver.resolve() else {
        bail!("volume '{}' is not connected", config.volume_label);
    };

    println!(
        "Volume '{}' mounted at {}",
        config.volume_label,
        mount.display()
    );
    backend::report_tool_availability();

    let daemon = Daemon::new(config);
    daemon.run_pass(&mount).await;

    Ok(())
}
