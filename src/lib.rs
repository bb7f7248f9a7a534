//! # drive-sentry
//!
//! Removable-drive backup watchdog that mirrors directories onto a labeled volume.
//!
//! ## Features
//!
//! - **Volume Watching**: Polls for a volume by label instead of a device path
//! - **Change Detection**: Subtree max-mtime markers skip unchanged sources
//! - **Backend Chain**: Robocopy or rsync when present, pure-Rust walker otherwise
//! - **Transcript Rotation**: Size-bounded rotation of the copy transcript log
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use drive_sentry::{Config, Daemon};
//! use std::path::Path;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::load(Path::new("drive-sentry.toml"))?;
//! Daemon::new(config).run().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod detect;
pub mod error;
pub mod logging;
pub mod logrotate;
pub mod monitor;
pub mod volume;

// Re-export commonly used types
pub use backend::{BackendChain, CopyOutcome, CopyReport};
pub use config::{Config, SyncPair};
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use monitor::{ConnectionMonitor, ConnectionState};
pub use volume::VolumeResolver;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
