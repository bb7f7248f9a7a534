//! Bulk copy via robocopy (Windows)
//!
//! Robocopy's exit-code space is an external contract: a bitmask where the
//! low bits report what happened and only values above the warning ceiling
//! mean the run failed. The interpretation table lives in [`classify_exit`]
//! as a pure mapping so it can be unit-tested without the tool.

use super::{CopyBackend, CopyOutcome, CopyReport};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

pub struct RobocopyBackend {
    transcript_path: PathBuf,
}

impl RobocopyBackend {
    pub fn new(transcript_path: PathBuf) -> Self {
        Self { transcript_path }
    }
}

/// Map a robocopy exit code to an outcome and its documented meaning.
///
/// Codes 0 through 7 are non-fatal: 0 and 1 are a clean no-op or copy,
/// 2 only reports extra files on the destination side, and 3 through 7
/// indicate that some files were mismatched or exhausted their retries
/// while the rest landed intact. Anything above 7 means the copy did not
/// complete.
pub fn classify_exit(code: i32) -> (CopyOutcome, &'static str) {
    match code {
        0 => (
            CopyOutcome::Success,
            "no files copied, source and destination synchronized",
        ),
        1 => (CopyOutcome::Success, "files copied successfully"),
        2 => (
            CopyOutcome::Success,
            "extra files detected in destination",
        ),
        3 => (
            CopyOutcome::PartialFailure,
            "copy incomplete, mismatched files",
        ),
        4 => (
            CopyOutcome::PartialFailure,
            "some files could not be copied",
        ),
        5 => (
            CopyOutcome::PartialFailure,
            "copy incomplete, retry limit exceeded",
        ),
        6 => (
            CopyOutcome::PartialFailure,
            "some files could not be copied, retry limit exceeded",
        ),
        7 => (
            CopyOutcome::PartialFailure,
            "files copied, some mismatched files or retries",
        ),
        _ => (CopyOutcome::Fatal, "serious error, copy did not complete"),
    }
}

#[async_trait]
impl CopyBackend for RobocopyBackend {
    fn name(&self) -> &'static str {
        "robocopy"
    }

    async fn copy(&self, source: &Path, dest: &Path) -> Result<CopyReport> {
        debug!(
            "invoking robocopy: {} -> {}",
            source.display(),
            dest.display()
        );

        let output = Command::new("robocopy")
            .arg(source)
            .arg(dest)
            .args([
                "/E",      // copy subdirectories, including empty ones
                "/COPY:DAT", // data, attributes, timestamps
                "/XO",     // skip files older than the destination
                "/XN",     // never overwrite a newer destination
                "/MT:1",   // single-threaded
                "/R:1",    // one retry
                "/W:1",    // one second between retries
                "/NP",     // no per-file progress in the log
            ])
            .arg(format!("/LOG+:{}", self.transcript_path.display()))
            .args(["/XF", "Thumbs.db", "*.tmp"])
            .args(["/XD", "$RECYCLE.BIN", "System Volume Information"])
            .output()
            .await
            .map_err(|e| Error::Tool {
                name: "robocopy",
                reason: e.to_string(),
            })?;

        let code = output.status.code().unwrap_or(-1);
        let (outcome, detail) = classify_exit(code);

        let message = if outcome == CopyOutcome::Fatal {
            let stderr = String::from_utf8_lossy(&output.stderr);
            format!("robocopy exit {}: {} ({})", code, detail, stderr.trim())
        } else {
            format!("robocopy exit {}: {}", code, detail)
        };

        Ok(CopyReport {
            outcome,
            files_copied: 0,
            files_skipped: 0,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_codes_are_success() {
        assert_eq!(classify_exit(0).0, CopyOutcome::Success);
        assert_eq!(classify_exit(1).0, CopyOutcome::Success);
        assert_eq!(classify_exit(2).0, CopyOutcome::Success);
    }

    #[test]
    fn test_warning_codes_are_partial() {
        for code in 3..=7 {
            assert_eq!(classify_exit(code).0, CopyOutcome::PartialFailure);
        }
    }

    #[test]
    fn test_codes_above_warning_ceiling_are_fatal() {
        assert_eq!(classify_exit(8).0, CopyOutcome::Fatal);
        assert_eq!(classify_exit(16).0, CopyOutcome::Fatal);
        assert_eq!(classify_exit(-1).0, CopyOutcome::Fatal);
    }

    #[test]
    fn test_noop_message() {
        assert_eq!(
            classify_exit(0).1,
            "no files copied, source and destination synchronized"
        );
    }
}
