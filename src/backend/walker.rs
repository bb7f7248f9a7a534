//! Pure walking fallback backend
//!
//! Always available; mirrors the source tree by walking it and applying the
//! per-file policy directly: copy when the destination is absent, sizes
//! differ, or the source is strictly newer. A newer destination is never
//! reverted. Timestamps are preserved so later passes keep comparing
//! against the source's real mtimes.

use super::{CopyBackend, CopyOutcome, CopyReport};
use crate::detect;
use crate::Result;
use async_trait::async_trait;
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

pub struct WalkerBackend;

const JUNK_DIRS: &[&str] = &["$RECYCLE.BIN", "System Volume Information"];

/// Transient junk that no backend should ever carry over
pub fn is_junk_file(name: &str) -> bool {
    name.eq_ignore_ascii_case("Thumbs.db")
        || name == ".DS_Store"
        || name == detect::MARKER_FILE
        || name.to_ascii_lowercase().ends_with(".tmp")
}

fn is_excluded(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        JUNK_DIRS.iter().any(|d| name.eq_ignore_ascii_case(d))
    } else {
        is_junk_file(&name)
    }
}

/// Per-file policy: destination absent, size mismatch, or strictly newer
/// source. Equal-or-newer destinations of the same size are left alone.
fn needs_file_copy(source: &Path, dest: &Path) -> io::Result<bool> {
    let source_meta = fs::metadata(source)?;
    let dest_meta = match fs::metadata(dest) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e),
    };

    if source_meta.len() != dest_meta.len() {
        return Ok(true);
    }

    Ok(source_meta.modified()? > dest_meta.modified()?)
}

fn copy_file_if_needed(source: &Path, dest: &Path) -> io::Result<bool> {
    if !needs_file_copy(source, dest)? {
        return Ok(false);
    }

    fs::copy(source, dest)?;

    // fs::copy carries permissions but not timestamps
    let metadata = fs::metadata(source)?;
    filetime::set_file_mtime(dest, FileTime::from_last_modification_time(&metadata))?;

    debug!("copied {}", source.display());
    Ok(true)
}

#[async_trait]
impl CopyBackend for WalkerBackend {
    fn name(&self) -> &'static str {
        "walker"
    }

    async fn copy(&self, source: &Path, dest: &Path) -> Result<CopyReport> {
        if let Err(e) = fs::create_dir_all(dest) {
            return Ok(CopyReport::fatal(format!(
                "cannot create destination {}: {}",
                dest.display(),
                e
            )));
        }

        let mut copied = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;

        let entries = WalkDir::new(source)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_excluded(e));

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    failed += 1;
                    continue;
                }
            };

            let relative = match entry.path().strip_prefix(source) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            if relative.as_os_str().is_empty() {
                continue;
            }

            let target = dest.join(relative);

            if entry.file_type().is_dir() {
                if let Err(e) = fs::create_dir_all(&target) {
                    warn!("cannot create directory {}: {}", target.display(), e);
                    failed += 1;
                }
                continue;
            }

            if !entry.file_type().is_file() {
                continue;
            }

            match copy_file_if_needed(entry.path(), &target) {
                Ok(true) => copied += 1,
                Ok(false) => skipped += 1,
                Err(e) => {
                    warn!("failed to copy {}: {}", entry.path().display(), e);
                    failed += 1;
                }
            }
        }

        let outcome = if failed > 0 {
            CopyOutcome::PartialFailure
        } else {
            CopyOutcome::Success
        };

        Ok(CopyReport {
            outcome,
            files_copied: copied,
            files_skipped: skipped,
            message: format!("{} copied, {} skipped, {} failed", copied, skipped, failed),
        })
    }
}
