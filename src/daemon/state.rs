//! Daemon marker content and process helpers.
//!
//! The marker file holds a JSON [`DaemonState`] written by the daemon once
//! it owns the marker lock.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AwdlError;

/// State of a running persistence daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaemonState {
    /// Process ID of the daemon
    pub pid: u32,
    /// Interface the daemon keeps down
    pub interface: String,
    /// When the daemon was started
    pub started_at: DateTime<Utc>,
    /// Re-assertion interval in milliseconds
    pub interval_ms: u64,
}

impl DaemonState {
    /// Create a daemon state for the current process
    pub fn new(interface: &str, interval: Duration) -> Self {
        Self {
            pid: std::process::id(),
            interface: interface.to_string(),
            started_at: Utc::now(),
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// What a marker file currently contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerContent {
    Missing,
    /// Present but not (yet) a complete state record.
    Invalid,
    State(DaemonState),
}

/// Read the marker at `path`.
///
/// A missing file and unparsable content are normal conditions (the daemon
/// may be between taking the lock and writing its state); only other I/O
/// failures are errors.
pub fn read_marker(path: &Path) -> Result<MarkerContent, AwdlError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(MarkerContent::Missing),
        Err(e) => return Err(AwdlError::io(path, e)),
    };

    Ok(serde_json::from_str(&content)
        .map(MarkerContent::State)
        .unwrap_or(MarkerContent::Invalid))
}

/// Check if a process is still alive
///
/// Uses kill(pid, 0). EPERM means the process exists but belongs to another
/// user, which is the normal case for `awdl status` run without sudo against
/// a root daemon.
pub fn is_process_alive(pid: u32) -> bool {
    let Some(pid) = to_pid(pid) else {
        return false;
    };
    // SAFETY: signal 0 performs only the existence and permission checks.
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Send SIGTERM to a process. Returns false if the signal could not be sent.
pub fn terminate_process(pid: u32) -> bool {
    let Some(pid) = to_pid(pid) else {
        return false;
    };
    // SAFETY: kill has no memory-safety preconditions; pid is a positive id.
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

/// Convert to a positive pid_t. Zero and negative values address process
/// groups in kill(2) and are never valid daemon pids.
fn to_pid(pid: u32) -> Option<libc::pid_t> {
    libc::pid_t::try_from(pid).ok().filter(|p| *p > 0)
}
