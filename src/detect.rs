//! Change detection via persisted max-mtime markers
//!
//! A copy pass is skipped when nothing under the source subtree changed
//! since the last successful copy. The decision compares the maximum
//! modification timestamp across the subtree against a sentinel file
//! persisted in the destination directory. This is a subtree-level
//! short-circuit only; the copy backends re-derive per-file necessity
//! themselves.

use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::debug;
use walkdir::WalkDir;

/// Sentinel file holding the max mtime observed at the last successful copy.
/// The dot prefix keeps it out of the way; a platform hidden attribute is
/// advisory and never required.
pub const MARKER_FILE: &str = ".sentry_last_sync";

/// Location of the marker for a destination directory
pub fn marker_path(dest: &Path) -> PathBuf {
    dest.join(MARKER_FILE)
}

/// Compute the maximum modification timestamp across a source subtree,
/// in seconds since the epoch. Covers the directory entry itself and every
/// file below it. Unreadable entries are skipped so a single bad file can
/// never mask changes elsewhere.
pub fn max_source_mtime(source: &Path) -> f64 {
    let mut max = mtime_secs(source).unwrap_or(0.0);

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping entry during mtime scan: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(mtime) = mtime_secs(entry.path()) {
            if mtime > max {
                max = mtime;
            }
        }
    }

    max
}

fn mtime_secs(path: &Path) -> Option<f64> {
    let metadata = fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs_f64())
}

/// Read the persisted marker for a destination, if present and parsable
pub fn read_marker(dest: &Path) -> Option<f64> {
    let content = fs::read_to_string(marker_path(dest)).ok()?;
    content.trim().parse::<f64>().ok()
}

/// Decide whether a copy is required given the observed source max-mtime.
/// A missing or unreadable marker always requires a copy.
pub fn needs_copy(dest: &Path, observed_max: f64) -> bool {
    match read_marker(dest) {
        Some(last) => observed_max > last,
        None => true,
    }
}

/// Persist the marker after a copy attempt reported success.
///
/// The value written is the max-mtime observed at scan time, not at
/// completion time: files modified during the copy keep the next cycle's
/// scan above the marker, so they are picked up then.
pub fn record_success(dest: &Path, observed_max: f64) -> Result<()> {
    fs::create_dir_all(dest)?;
    fs::write(marker_path(dest), observed_max.to_string())?;
    Ok(())
}
