//! Size-bounded rotation for the copy transcript log
//!
//! The transcript is the backends' own operational log, separate from the
//! application's structured log. Rotation renames (never truncates) and is
//! only invoked between writes, so in-flight output is never lost.

use crate::Result;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Bounds for one rotated log family
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    /// Rotate once the live file reaches this size
    pub max_size_bytes: u64,
    /// Keep at most this many archived generations
    pub max_generations: usize,
}

/// Rotate the log if it has reached the size threshold.
///
/// Safe to call when the file does not exist yet (no-op). On rotation the
/// live file is renamed to a timestamped archive and the oldest archives
/// beyond the generation cap are deleted.
pub fn rotate_if_needed(log_path: &Path, policy: &RotationPolicy) -> Result<()> {
    let metadata = match fs::metadata(log_path) {
        Ok(metadata) => metadata,
        Err(_) => return Ok(()),
    };

    if metadata.len() < policy.max_size_bytes {
        return Ok(());
    }

    let archived = archive_name(log_path, Local::now());
    fs::rename(log_path, &archived)?;
    debug!("rotated transcript log to {}", archived.display());

    prune_archives(log_path, policy.max_generations)
}

/// Archive name for a live log: `<stem>_<YYYYmmdd_HHMMSS>[.<ext>]`
fn archive_name(log_path: &Path, at: DateTime<Local>) -> PathBuf {
    let stem = log_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("transcript");
    let stamp = at.format("%Y%m%d_%H%M%S");

    let name = match log_path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext),
        None => format!("{}_{}", stem, stamp),
    };

    log_path.with_file_name(name)
}

/// Delete the oldest archives until at most `max_generations` remain.
/// Archives are ordered by file creation time, falling back to mtime on
/// filesystems that do not report it.
fn prune_archives(log_path: &Path, max_generations: usize) -> Result<()> {
    let dir = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let stem = log_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("transcript");
    let prefix = format!("{}_", stem);
    let suffix = log_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| format!(".{}", ext));

    let mut archives: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if !name.starts_with(&prefix) {
            continue;
        }
        if let Some(suffix) = &suffix {
            if !name.ends_with(suffix.as_str()) {
                continue;
            }
        }

        let metadata = entry.metadata()?;
        let age = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(UNIX_EPOCH);
        archives.push((age, entry.path()));
    }

    archives.sort();
    while archives.len() > max_generations {
        let (_, oldest) = archives.remove(0);
        match fs::remove_file(&oldest) {
            Ok(()) => debug!("pruned old transcript archive {}", oldest.display()),
            Err(e) => warn!("failed to prune archive {}: {}", oldest.display(), e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn policy(max_size_bytes: u64, max_generations: usize) -> RotationPolicy {
        RotationPolicy {
            max_size_bytes,
            max_generations,
        }
    }

    fn list_archives(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("copy_"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_missing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("copy.log");

        rotate_if_needed(&log, &policy(10, 3)).unwrap();
        assert!(!log.exists());
    }

    #[test]
    fn test_under_threshold_is_noop() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("copy.log");
        fs::write(&log, "tiny").unwrap();

        rotate_if_needed(&log, &policy(1024, 3)).unwrap();
        assert!(log.exists());
        assert_eq!(list_archives(dir.path()).len(), 0);
    }

    #[test]
    fn test_rotation_produces_one_archive() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("copy.log");
        fs::write(&log, vec![b'x'; 64]).unwrap();

        rotate_if_needed(&log, &policy(64, 3)).unwrap();

        assert!(!log.exists());
        assert_eq!(list_archives(dir.path()).len(), 1);

        // The next write goes to a fresh live file
        fs::write(&log, "fresh").unwrap();
        assert_eq!(fs::read_to_string(&log).unwrap(), "fresh");
    }

    #[test]
    fn test_generation_cap_prunes_oldest() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("copy.log");

        // Two pre-existing archives, created oldest-first
        let oldest = dir.path().join("copy_20240101_000000.log");
        let newer = dir.path().join("copy_20240201_000000.log");
        fs::write(&oldest, "old").unwrap();
        fs::write(&newer, "new").unwrap();

        fs::write(&log, vec![b'x'; 64]).unwrap();
        rotate_if_needed(&log, &policy(64, 2)).unwrap();

        let archives = list_archives(dir.path());
        assert_eq!(archives.len(), 2);
        assert!(!oldest.exists());
        assert!(newer.exists());
    }

    #[test]
    fn test_archive_name_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 5, 7, 9, 11).unwrap();

        assert_eq!(
            archive_name(Path::new("/var/log/copy.log"), at),
            PathBuf::from("/var/log/copy_20240305_070911.log")
        );
        assert_eq!(
            archive_name(Path::new("transcript"), at),
            PathBuf::from("transcript_20240305_070911")
        );
    }
}
