//! Copy backends and the fallback chain
//!
//! Three strategies with different guarantees: the native bulk tool
//! (robocopy), the remote-sync tool (rsync), and a pure walking fallback
//! that is always available. Exactly one backend is selected per process
//! and used exclusively for every pair; tool availability cannot change
//! during a run, so the probes are cached for the process lifetime.

use crate::config::TranscriptConfig;
use crate::logrotate::{self, RotationPolicy};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Local;
use once_cell::sync::OnceCell;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::{info, warn};

pub mod robocopy;
pub mod rsync;
pub mod walker;

pub use robocopy::RobocopyBackend;
pub use rsync::RsyncBackend;
pub use walker::WalkerBackend;

/// Hard ceiling on a single pair's copy duration
pub const COPY_TIMEOUT: Duration = Duration::from_secs(3600);

/// Normalized outcome of one backend invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// Pure no-op or full copy, nothing lost
    Success,
    /// Some files could not be copied, the rest landed intact
    PartialFailure,
    /// The copy did not complete; the sync marker must not be written
    Fatal,
}

/// Result of one backend invocation, consumed uniformly by the caller
/// regardless of which backend ran
#[derive(Debug, Clone)]
pub struct CopyReport {
    pub outcome: CopyOutcome,
    pub files_copied: usize,
    pub files_skipped: usize,
    pub message: String,
}

impl CopyReport {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            outcome: CopyOutcome::Fatal,
            files_copied: 0,
            files_skipped: 0,
            message: message.into(),
        }
    }

    /// Marker policy: Success and PartialFailure both count as a completed
    /// attempt (forward progress over endless whole-subtree retries); only
    /// Fatal withholds the marker so the next cycle retries.
    pub fn updates_marker(&self) -> bool {
        self.outcome != CopyOutcome::Fatal
    }
}

/// One concrete copy strategy
#[async_trait]
pub trait CopyBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn copy(&self, source: &Path, dest: &Path) -> Result<CopyReport>;
}

static ROBOCOPY_AVAILABLE: OnceCell<bool> = OnceCell::new();
static RSYNC_AVAILABLE: OnceCell<bool> = OnceCell::new();

/// Whether robocopy can be spawned. Probed once per process.
pub fn robocopy_available() -> bool {
    *ROBOCOPY_AVAILABLE.get_or_init(|| {
        // robocopy exits nonzero even for /?, spawning is the signal
        probe("robocopy", &["/?"]).is_some()
    })
}

/// Whether rsync can be spawned and reports a version. Probed once per process.
pub fn rsync_available() -> bool {
    *RSYNC_AVAILABLE.get_or_init(|| probe("rsync", &["--version"]) == Some(true))
}

/// Run a probe command; None if it could not be spawned, otherwise whether
/// it exited successfully.
fn probe(tool: &str, args: &[&str]) -> Option<bool> {
    std::process::Command::new(tool)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .ok()
        .map(|status| status.success())
}

/// Pick the best available backend for this platform.
///
/// Windows prefers robocopy, everything else prefers rsync; the walker is
/// the universal fallback. The choice is logged once by the caller.
pub fn select_backend(transcript_path: &Path) -> Box<dyn CopyBackend> {
    if cfg!(windows) {
        if robocopy_available() {
            return Box::new(RobocopyBackend::new(transcript_path.to_path_buf()));
        }
    } else if rsync_available() {
        return Box::new(RsyncBackend);
    }
    Box::new(WalkerBackend)
}

/// Executes the selected backend per pair with a hard timeout, keeps the
/// transcript log rotated, and normalizes failures into [`CopyReport`]s.
pub struct BackendChain {
    backend: Box<dyn CopyBackend>,
    transcript_path: PathBuf,
    rotation: RotationPolicy,
    timeout: Duration,
}

impl BackendChain {
    pub fn new(transcript: &TranscriptConfig) -> Self {
        Self::with_backend(select_backend(&transcript.path), transcript)
    }

    pub fn with_backend(backend: Box<dyn CopyBackend>, transcript: &TranscriptConfig) -> Self {
        Self {
            backend,
            transcript_path: transcript.path.clone(),
            rotation: RotationPolicy {
                max_size_bytes: transcript.max_size_bytes,
                max_generations: transcript.max_generations,
            },
            timeout: COPY_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Copy one pair through the selected backend.
    ///
    /// Never returns an error: spawn failures and timeouts are folded into
    /// a Fatal report so the caller can treat every backend uniformly and
    /// keep iterating the remaining pairs.
    pub async fn copy_pair(&self, source: &Path, dest: &Path) -> CopyReport {
        if let Err(e) = logrotate::rotate_if_needed(&self.transcript_path, &self.rotation) {
            warn!("transcript rotation failed: {}", e);
        }

        let report = match tokio::time::timeout(self.timeout, self.backend.copy(source, dest)).await
        {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => CopyReport::fatal(e.to_string()),
            Err(_) => CopyReport::fatal(
                Error::Timeout {
                    secs: self.timeout.as_secs(),
                }
                .to_string(),
            ),
        };

        self.append_transcript(source, dest, &report);
        report
    }

    /// One summary line per invocation; robocopy additionally appends its
    /// own detail via `/LOG+` to the same file.
    fn append_transcript(&self, source: &Path, dest: &Path, report: &CopyReport) {
        let line = format!(
            "{} [{}] {} -> {}: {:?}, {} copied, {} skipped ({})\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.backend.name(),
            source.display(),
            dest.display(),
            report.outcome,
            report.files_copied,
            report.files_skipped,
            report.message,
        );

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.transcript_path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        if let Err(e) = result {
            warn!("failed to append transcript entry: {}", e);
        }
    }
}

/// Log the one-time availability report for the external tools
pub fn report_tool_availability() {
    if cfg!(windows) {
        info!(
            "robocopy available: {}",
            if robocopy_available() { "yes" } else { "no" }
        );
    } else {
        info!(
            "rsync available: {}",
            if rsync_available() { "yes" } else { "no" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct SlowBackend;

    #[async_trait]
    impl CopyBackend for SlowBackend {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn copy(&self, _source: &Path, _dest: &Path) -> Result<CopyReport> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(CopyReport {
                outcome: CopyOutcome::Success,
                files_copied: 1,
                files_skipped: 0,
                message: "done".to_string(),
            })
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl CopyBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn copy(&self, _source: &Path, _dest: &Path) -> Result<CopyReport> {
            Err(Error::Tool {
                name: "failing",
                reason: "spawn refused".to_string(),
            })
        }
    }

    fn transcript_in(dir: &TempDir) -> TranscriptConfig {
        TranscriptConfig {
            path: dir.path().join("copy.log"),
            max_size_bytes: 1024 * 1024,
            max_generations: 2,
        }
    }

    #[tokio::test]
    async fn test_timeout_is_fatal_for_the_pair() {
        let dir = TempDir::new().unwrap();
        let chain = BackendChain::with_backend(Box::new(SlowBackend), &transcript_in(&dir))
            .with_timeout(Duration::from_millis(20));

        let report = chain.copy_pair(Path::new("/src"), Path::new("/dst")).await;
        assert_eq!(report.outcome, CopyOutcome::Fatal);
        assert!(!report.updates_marker());
    }

    #[tokio::test]
    async fn test_backend_error_becomes_fatal_report() {
        let dir = TempDir::new().unwrap();
        let chain = BackendChain::with_backend(Box::new(FailingBackend), &transcript_in(&dir));

        let report = chain.copy_pair(Path::new("/src"), Path::new("/dst")).await;
        assert_eq!(report.outcome, CopyOutcome::Fatal);
        assert!(report.message.contains("spawn refused"));
    }

    #[tokio::test]
    async fn test_transcript_line_appended() {
        let dir = TempDir::new().unwrap();
        let transcript = transcript_in(&dir);
        let chain = BackendChain::with_backend(Box::new(FailingBackend), &transcript);

        chain.copy_pair(Path::new("/src"), Path::new("/dst")).await;
        chain.copy_pair(Path::new("/src"), Path::new("/dst")).await;

        let content = std::fs::read_to_string(&transcript.path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("[failing]"));
    }

    #[test]
    fn test_partial_failure_still_updates_marker() {
        let report = CopyReport {
            outcome: CopyOutcome::PartialFailure,
            files_copied: 3,
            files_skipped: 1,
            message: "1 failed".to_string(),
        };
        assert!(report.updates_marker());
        assert!(!CopyReport::fatal("nope").updates_marker());
    }
}
