//! Command-line interface for drive-sentry.
//!
//! This module provides the clap-based CLI for running the watchdog,
//! one-shot sync passes, and volume inspection.

use clap::{Parser, Subcommand};

pub mod check;
pub mod run;
pub mod volumes;

/// drive-sentry - Removable-drive backup watchdog
#[derive(Parser)]
#[command(name = "drive-sentry")]
#[command(about = "Mirrors directories onto a labeled removable volume whenever it appears")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Watch for the volume and mirror continuously
    Run(run::RunArgs),
    /// Resolve the volume and run a single sync pass now
    Check(check::CheckArgs),
    /// List currently mounted, labeled volumes
    Volumes(volumes::VolumesArgs),
}
