//! Connection-state tracking and sync triggering
//!
//! Two states, one transition rule set. The decision logic is separated
//! from the polling loop so it can be driven with plain instants in tests:
//! each poll feeds the resolver's answer into [`ConnectionMonitor::observe`]
//! and acts on the returned [`PollAction`].

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Whether the watched volume is currently attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// What the current poll requires of the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAction {
    /// Nothing to do this tick
    Idle,
    /// The volume just went away; no copy activity
    Disconnected,
    /// The volume just appeared; run a full pass immediately
    ConnectSync(PathBuf),
    /// Still attached and the scan interval has elapsed; run a pass
    IntervalSync(PathBuf),
}

/// Owns the connection state; mutated only on poll boundaries
pub struct ConnectionMonitor {
    state: ConnectionState,
    last_sync: Option<Instant>,
    scan_interval: Duration,
}

impl ConnectionMonitor {
    pub fn new(scan_interval: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            last_sync: None,
            scan_interval,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Fold one resolver answer into the state machine.
    ///
    /// A connect transition always triggers an immediate pass regardless of
    /// the interval; a disconnect transition triggers none. While attached,
    /// passes repeat once the interval has elapsed since the last one.
    pub fn observe(&mut self, mount: Option<PathBuf>, now: Instant) -> PollAction {
        match (self.state, mount) {
            (ConnectionState::Connected, None) => {
                self.state = ConnectionState::Disconnected;
                PollAction::Disconnected
            }
            (ConnectionState::Disconnected, None) => PollAction::Idle,
            (ConnectionState::Disconnected, Some(mount)) => {
                self.state = ConnectionState::Connected;
                self.last_sync = Some(now);
                PollAction::ConnectSync(mount)
            }
            (ConnectionState::Connected, Some(mount)) => {
                let elapsed = self
                    .last_sync
                    .map(|last| now.duration_since(last) > self.scan_interval)
                    .unwrap_or(true);

                if elapsed {
                    self.last_sync = Some(now);
                    PollAction::IntervalSync(mount)
                } else {
                    PollAction::Idle
                }
            }
        }
    }
}
