//! The polling loop that ties the components together
//!
//! Single-threaded and cooperative: one tick polls the resolver, feeds the
//! monitor, and runs sync passes sequentially. Nothing in steady state is
//! allowed to terminate the loop; per-pair failures are logged and the
//! remaining pairs still run.

use crate::backend::{BackendChain, CopyOutcome};
use crate::config::{Config, SyncPair};
use crate::detect;
use crate::monitor::{ConnectionMonitor, PollAction};
use crate::volume::{self, VolumeResolver};
use crate::Result;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Fixed poll period for volume presence checks
pub const POLL_PERIOD: Duration = Duration::from_secs(5);

pub struct Daemon {
    config: Config,
    resolver: VolumeResolver,
    monitor: ConnectionMonitor,
    chain: BackendChain,
}

impl Daemon {
    pub fn new(config: Config) -> Self {
        let resolver =
            VolumeResolver::new(config.volume_label.clone(), volume::platform_lister());
        let chain = BackendChain::new(&config.transcript);
        Self::with_parts(config, resolver, chain)
    }

    /// Assemble a daemon from pre-built parts; used by tests and embedders
    pub fn with_parts(config: Config, resolver: VolumeResolver, chain: BackendChain) -> Self {
        let monitor = ConnectionMonitor::new(Duration::from_secs(config.scan_interval_secs));
        Self {
            config,
            resolver,
            monitor,
            chain,
        }
    }

    /// Run the polling loop until the process is terminated
    pub async fn run(mut self) -> Result<()> {
        info!(
            "watching for volume '{}', re-sync every {}s, backend: {}",
            self.config.volume_label,
            self.config.scan_interval_secs,
            self.chain.backend_name()
        );

        let mut ticker = tokio::time::interval(POLL_PERIOD);
        // A pass can take longer than the poll period; don't replay missed ticks
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    async fn poll_once(&mut self) {
        let mount = self.resolver.resolve();
        match self.monitor.observe(mount, Instant::now()) {
            PollAction::Idle => {}
            PollAction::Disconnected => {
                info!("volume '{}' disconnected", self.config.volume_label);
            }
            PollAction::ConnectSync(mount) => {
                info!(
                    "volume '{}' connected at {}",
                    self.config.volume_label,
                    mount.display()
                );
                self.run_pass(&mount).await;
            }
            PollAction::IntervalSync(mount) => {
                debug!("scan interval elapsed, re-running pass");
                self.run_pass(&mount).await;
            }
        }
    }

    /// One full pass over all configured pairs, in configured order.
    /// Failure in one pair never blocks the others.
    pub async fn run_pass(&self, mount: &Path) {
        for pair in &self.config.pairs {
            if !pair.source.exists() {
                warn!("source missing, skipping pair: {}", pair.source.display());
                continue;
            }

            let dest = mount.join(&pair.destination);
            self.sync_pair(pair, &dest).await;
        }
    }

    async fn sync_pair(&self, pair: &SyncPair, dest: &Path) {
        let observed = detect::max_source_mtime(&pair.source);
        if !detect::needs_copy(dest, observed) {
            info!(
                "no changes detected in {}, copying not required",
                pair.source.display()
            );
            return;
        }

        info!("changes detected in {}, starting copy", pair.source.display());
        let start = Instant::now();
        let report = self.chain.copy_pair(&pair.source, dest).await;
        let elapsed = start.elapsed().as_secs_f64();

        match report.outcome {
            CopyOutcome::Fatal => {
                error!(
                    "copy of {} failed after {:.2}s: {}",
                    pair.source.display(),
                    elapsed,
                    report.message
                );
            }
            outcome => {
                if outcome == CopyOutcome::PartialFailure {
                    warn!("some files could not be copied: {}", report.message);
                }
                if let Err(e) = detect::record_success(dest, observed) {
                    warn!(
                        "failed to persist sync marker in {}: {}",
                        dest.display(),
                        e
                    );
                }
                info!(
                    "copy of {} finished in {:.2}s: {} copied, {} skipped",
                    pair.source.display(),
                    elapsed,
                    report.files_copied,
                    report.files_skipped
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CopyBackend, CopyReport, WalkerBackend};
    use crate::config::TranscriptConfig;
    use crate::volume::{MountedVolume, VolumeLister};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct StubLister;

    impl VolumeLister for StubLister {
        fn list(&self) -> crate::Result<Vec<MountedVolume>> {
            Ok(Vec::new())
        }
    }

    struct CountingBackend {
        calls: Arc<AtomicUsize>,
        outcome: CopyOutcome,
    }

    #[async_trait]
    impl CopyBackend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn copy(&self, _source: &Path, _dest: &Path) -> crate::Result<CopyReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CopyReport {
                outcome: self.outcome,
                files_copied: 0,
                files_skipped: 0,
                message: "stub".to_string(),
            })
        }
    }

    fn daemon_with(
        source: &Path,
        transcript_dir: &Path,
        backend: Box<dyn CopyBackend>,
    ) -> Daemon {
        let config = Config {
            volume_label: "BACKUP".to_string(),
            scan_interval_secs: 300,
            pairs: vec![SyncPair {
                source: source.to_path_buf(),
                destination: PathBuf::from("backup/data"),
            }],
            transcript: TranscriptConfig {
                path: transcript_dir.join("copy.log"),
                max_size_bytes: 1024 * 1024,
                max_generations: 2,
            },
        };
        let resolver = VolumeResolver::new("BACKUP", Box::new(StubLister));
        let chain = BackendChain::with_backend(backend, &config.transcript);
        Daemon::with_parts(config, resolver, chain)
    }

    #[tokio::test]
    async fn test_pass_mirrors_and_records_marker() {
        let source = TempDir::new().unwrap();
        let mount = TempDir::new().unwrap();
        fs::write(source.path().join("a.txt"), "alpha").unwrap();

        let daemon = daemon_with(source.path(), mount.path(), Box::new(WalkerBackend));
        daemon.run_pass(mount.path()).await;

        let dest = mount.path().join("backup/data");
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "alpha");
        assert!(detect::read_marker(&dest).is_some());
    }

    #[tokio::test]
    async fn test_unchanged_pass_skips_backend() {
        let source = TempDir::new().unwrap();
        let mount = TempDir::new().unwrap();
        fs::write(source.path().join("a.txt"), "alpha").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let daemon = daemon_with(
            source.path(),
            mount.path(),
            Box::new(CountingBackend {
                calls: calls.clone(),
                outcome: CopyOutcome::Success,
            }),
        );

        daemon.run_pass(mount.path()).await;
        daemon.run_pass(mount.path()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fatal_outcome_withholds_marker() {
        let source = TempDir::new().unwrap();
        let mount = TempDir::new().unwrap();
        fs::write(source.path().join("a.txt"), "alpha").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let daemon = daemon_with(
            source.path(),
            mount.path(),
            Box::new(CountingBackend {
                calls: calls.clone(),
                outcome: CopyOutcome::Fatal,
            }),
        );

        daemon.run_pass(mount.path()).await;
        assert!(detect::read_marker(&mount.path().join("backup/data")).is_none());

        // Next pass retries the pair
        daemon.run_pass(mount.path()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_still_records_marker() {
        let source = TempDir::new().unwrap();
        let mount = TempDir::new().unwrap();
        fs::write(source.path().join("a.txt"), "alpha").unwrap();

        let daemon = daemon_with(
            source.path(),
            mount.path(),
            Box::new(CountingBackend {
                calls: Arc::new(AtomicUsize::new(0)),
                outcome: CopyOutcome::PartialFailure,
            }),
        );

        daemon.run_pass(mount.path()).await;
        assert!(detect::read_marker(&mount.path().join("backup/data")).is_some());
    }

    #[tokio::test]
    async fn test_missing_source_skips_pair() {
        let gone = TempDir::new().unwrap();
        let missing = gone.path().join("not-there");
        let mount = TempDir::new().unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let daemon = daemon_with(
            &missing,
            mount.path(),
            Box::new(CountingBackend {
                calls: calls.clone(),
                outcome: CopyOutcome::Success,
            }),
        );

        daemon.run_pass(mount.path()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
