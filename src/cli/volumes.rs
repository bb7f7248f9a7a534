//! Volumes command implementation.

use crate::volume;
use clap::Args;

/// Arguments for the volumes command
#[derive(Args)]
pub struct VolumesArgs {}

/// List currently mounted, labeled volumes
pub async fn run(_args: VolumesArgs) -> anyhow::Result<()> {
    let volumes = volume::platform_lister().list()?;

    if volumes.is_empty() {
        println!("No labeled volumes mounted.");
        return Ok(());
    }

    println!("Mounted volumes");
    println!("===============\n");
    for volume in &volumes {
        println!("{:<24} {}", volume.label, volume.mount_path.display());
    }

    Ok(())
}
