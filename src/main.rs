//! drive-sentry - Removable-drive backup watchdog
//!
//! Main binary entry point for the command-line interface.

use clap::Parser;
use drive_sentry::cli::{Cli, Commands};
use drive_sentry::logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Run(args) => drive_sentry::cli::run::run(args).await,
        Commands::Check(args) => drive_sentry::cli::check::run(args).await,
        Commands::Volumes(args) => drive_sentry::cli::volumes::run(args).await,
    }
}
