//! Configuration loading and validation

use crate::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Floor for the scan interval; shorter values hammer the volume lister
pub const MIN_SCAN_INTERVAL_SECS: u64 = 10;

const DEFAULT_SCAN_INTERVAL_SECS: u64 = 300;

/// Top-level configuration for the watchdog
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Label of the volume to watch for (case-insensitive substring match)
    pub volume_label: String,

    /// Seconds between re-sync passes while the volume stays attached
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// Directories to mirror, in order
    #[serde(rename = "pair")]
    pub pairs: Vec<SyncPair>,

    /// Copy transcript log and its rotation bounds
    #[serde(default)]
    pub transcript: TranscriptConfig,
}

/// One source-directory-to-destination mapping
#[derive(Debug, Clone, Deserialize)]
pub struct SyncPair {
    /// Source directory on the local machine
    pub source: PathBuf,
    /// Destination directory, relative to the volume mount point
    pub destination: PathBuf,
}

/// Settings for the backend transcript log
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub path: PathBuf,
    pub max_size_bytes: u64,
    pub max_generations: usize,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("drive-sentry-transcript.log"),
            max_size_bytes: 10 * 1024 * 1024,
            max_generations: 10,
        }
    }
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

impl Config {
    /// Load and validate a configuration file.
    ///
    /// Any failure here is fatal to startup; steady-state operation never
    /// re-reads the configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| Error::Config {
            reason: format!("cannot parse {}: {}", path.display(), e),
        })?;

        config.validated()
    }

    /// Validate field contents and clamp the scan interval to its floor.
    pub fn validated(mut self) -> Result<Self> {
        if self.volume_label.trim().is_empty() {
            return Err(Error::Config {
                reason: "volume_label must not be empty".to_string(),
            });
        }

        if self.pairs.is_empty() {
            return Err(Error::Config {
                reason: "at least one [[pair]] is required".to_string(),
            });
        }

        for pair in &self.pairs {
            if pair.destination.is_absolute() {
                return Err(Error::Config {
                    reason: format!(
                        "destination must be relative to the volume mount: {}",
                        pair.destination.display()
                    ),
                });
            }
        }

        if self.scan_interval_secs < MIN_SCAN_INTERVAL_SECS {
            warn!(
                "scan_interval_secs {} is below the {} second floor, clamping",
                self.scan_interval_secs, MIN_SCAN_INTERVAL_SECS
            );
            self.scan_interval_secs = MIN_SCAN_INTERVAL_SECS;
        }

        Ok(self)
    }
}
