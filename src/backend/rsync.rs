//! Remote-sync copy via rsync (non-Windows)
//!
//! rsync does its own per-file diffing; `--update` keeps the transfer
//! one-directional by never touching a newer destination. The itemized
//! change list on stdout is the source of the copied-file count.

use super::{CopyBackend, CopyOutcome, CopyReport};
use crate::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

pub struct RsyncBackend;

/// Count transferred files in `--itemize-changes` output. Received files
/// are itemized with a leading `>`; everything else (directory chatter,
/// attribute-only changes) is not a copy.
pub fn count_transfers(stdout: &str) -> usize {
    stdout.lines().filter(|line| line.starts_with('>')).count()
}

/// rsync copies the directory itself unless the source ends with a slash
fn slashed(source: &Path) -> OsString {
    let mut arg = source.as_os_str().to_os_string();
    if !arg.to_string_lossy().ends_with('/') {
        arg.push("/");
    }
    arg
}

#[async_trait]
impl CopyBackend for RsyncBackend {
    fn name(&self) -> &'static str {
        "rsync"
    }

    async fn copy(&self, source: &Path, dest: &Path) -> Result<CopyReport> {
        debug!("invoking rsync: {} -> {}", source.display(), dest.display());

        let output = Command::new("rsync")
            .args(["-a", "--update", "--itemize-changes"])
            .args([
                "--exclude=Thumbs.db",
                "--exclude=*.tmp",
                "--exclude=.DS_Store",
                "--exclude=$RECYCLE.BIN",
                "--exclude=System Volume Information",
            ])
            .arg(slashed(source))
            .arg(dest)
            .output()
            .await
            .map_err(|e| Error::Tool {
                name: "rsync",
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(CopyReport::fatal(format!(
                "rsync exit {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let copied = count_transfers(&stdout);
        let message = if copied == 0 {
            "files are up to date, nothing transferred".to_string()
        } else {
            format!("{} files transferred", copied)
        };

        Ok(CopyReport {
            outcome: CopyOutcome::Success,
            files_copied: copied,
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
    fn test_count_transfers_mixed_output() {
        let stdout = concat!(
            "sending incremental file list\n",
            ">f+++++++++ photos/img_0001.jpg\n",
            ">f..t...... photos/img_0002.jpg\n",
            ".d..t...... photos/\n",
            "cd+++++++++ photos/raw/\n",
        );

        assert_eq!(count_transfers(stdout), 2);
    }

    #[test]
    fn test_count_transfers_no_changes() {
        assert_eq!(count_transfers("sending incremental file list\n"), 0);
        assert_eq!(count_transfers(""), 0);
    }

    #[test]
    fn test_slashed_appends_once() {
        assert_eq!(slashed(Path::new("/data/photos")), OsString::from("/data/photos/"));
        assert_eq!(slashed(Path::new("/data/photos/")), OsString::from("/data/photos/"));
    }
}
