//! Persistence daemon lifecycle.
//!
//! The daemon is a separate long-lived process running
//! [`persistence::Persistence`]. This module is the CLI side of it: deciding
//! whether a daemon is live from its marker, spawning one, and stopping it.
//!
//! A daemon counts as live only when its marker names a live pid *and* the
//! marker lock is held. Anything else found on disk is stale and is cleaned
//! up by the next `disable` or `enable`.

mod persistence;
mod spawn;
mod state;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

pub use persistence::{Persistence, PersistenceReport, RetryPolicy};
pub use spawn::{spawn_detached, DaemonCommand};
pub use state::{is_process_alive, read_marker, terminate_process, DaemonState, MarkerContent};

use crate::error::AwdlError;
use crate::lock::{self, MarkerLock};

/// Interval between marker checks while waiting for start or stop
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Observed daemon state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonStatus {
    Stopped,
    /// Lock held but state not written yet
    Starting,
    Running(DaemonState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(DaemonState),
    /// A live daemon was already there; nothing was spawned for it.
    AlreadyRunning(DaemonState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    Stopped(DaemonState),
}

/// Control surface the commands use to manage the daemon.
#[async_trait]
pub trait DaemonControl: Send + Sync {
    /// Report liveness without changing anything on disk.
    async fn status(&self) -> Result<DaemonStatus, AwdlError>;

    /// Start the daemon unless a live one exists. Idempotent.
    async fn ensure_running(&self) -> Result<StartOutcome, AwdlError>;

    /// Stop the daemon and wait until it has exited. Idempotent.
    async fn stop(&self) -> Result<StopOutcome, AwdlError>;
}

#[derive(Debug)]
enum Marker {
    Absent,
    Starting,
    Live(DaemonState),
    Stale,
}

/// Daemon running as a detached OS process, tracked by a locked marker file.
pub struct ProcessDaemon {
    marker: PathBuf,
    command: DaemonCommand,
    startup_timeout: Duration,
    stop_timeout: Duration,
}

impl ProcessDaemon {
    pub fn new(
        marker: PathBuf,
        command: DaemonCommand,
        startup_timeout: Duration,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            marker,
            command,
            startup_timeout,
            stop_timeout,
        }
    }

    fn inspect(&self) -> Result<Marker, AwdlError> {
        let content = read_marker(&self.marker)?;
        if content == MarkerContent::Missing {
            return Ok(Marker::Absent);
        }

        let held = lock::is_held(&self.marker)?;
        Ok(match content {
            MarkerContent::State(state) if held && is_process_alive(state.pid) => {
                Marker::Live(state)
            }
            MarkerContent::Invalid if held => Marker::Starting,
            _ => Marker::Stale,
        })
    }

    /// Remove a stale marker. Taking the lock first guarantees no daemon
    /// is using it; if one is, it is starting up and the marker is kept.
    fn clear_stale(&self) -> Result<bool, AwdlError> {
        match MarkerLock::acquire(&self.marker) {
            Ok(lock) => {
                debug!("Removing stale daemon marker {:?}", self.marker);
                drop(lock);
                Ok(true)
            }
            Err(AwdlError::DaemonAlreadyRunning { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn wait_until_live(&self, timeout: Duration) -> Result<DaemonState, AwdlError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Marker::Live(state) = self.inspect()? {
                return Ok(state);
            }
            if Instant::now() >= deadline {
                return Err(AwdlError::DaemonStartFailed(format!(
                    "no live daemon marker at {} after {:?} (see {})",
                    self.marker.display(),
                    timeout,
                    self.command.log_file.display()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Signal the daemon and wait until it has stopped re-asserting.
    ///
    /// The daemon releases the marker lock only after its loop has exited,
    /// so either the lock going away or the process going away confirms it.
    async fn terminate(&self, state: DaemonState) -> Result<StopOutcome, AwdlError> {
        info!("Stopping persistence daemon (PID {})...", state.pid);
        if !terminate_process(state.pid) && is_process_alive(state.pid) {
            return Err(AwdlError::DaemonStopFailed {
                pid: state.pid,
                timeout: Duration::ZERO,
            });
        }

        let deadline = Instant::now() + self.stop_timeout;
        while is_process_alive(state.pid) && lock::is_held(&self.marker)? {
            if Instant::now() >= deadline {
                return Err(AwdlError::DaemonStopFailed {
                    pid: state.pid,
                    timeout: self.stop_timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        // A daemon killed before its cleanup leaves the marker behind.
        if read_marker(&self.marker)? != MarkerContent::Missing && !self.clear_stale()? {
            warn!("Marker {:?} still locked after daemon exit", self.marker);
        }

        Ok(StopOutcome::Stopped(state))
    }
}

#[async_trait]
impl DaemonControl for ProcessDaemon {
    async fn status(&self) -> Result<DaemonStatus, AwdlError> {
        Ok(match self.inspect()? {
            Marker::Live(state) => DaemonStatus::Running(state),
            Marker::Starting => DaemonStatus::Starting,
            Marker::Absent | Marker::Stale => DaemonStatus::Stopped,
        })
    }

    async fn ensure_running(&self) -> Result<StartOutcome, AwdlError> {
        match self.inspect()? {
            Marker::Live(state) => {
                debug!("Daemon already running (PID {})", state.pid);
                return Ok(StartOutcome::AlreadyRunning(state));
            }
            Marker::Starting => {
                let state = self.wait_until_live(self.startup_timeout).await?;
                return Ok(StartOutcome::AlreadyRunning(state));
            }
            Marker::Stale => {
                self.clear_stale()?;
            }
            Marker::Absent => {}
        }

        let pid = spawn_detached(&self.command)?;
        let state = self.wait_until_live(self.startup_timeout).await?;

        // A concurrent `disable` may have won the lock; its daemon is just as good.
        if state.pid == pid {
            Ok(StartOutcome::Started(state))
        } else {
            Ok(StartOutcome::AlreadyRunning(state))
        }
    }

    async fn stop(&self) -> Result<StopOutcome, AwdlError> {
        match self.inspect()? {
            Marker::Absent => Ok(StopOutcome::NotRunning),
            Marker::Stale => {
                self.clear_stale()?;
                Ok(StopOutcome::NotRunning)
            }
            Marker::Starting => {
                let state = self.wait_until_live(self.startup_timeout).await?;
                self.terminate(state).await
            }
            Marker::Live(state) => self.terminate(state).await,
        }
    }
}
