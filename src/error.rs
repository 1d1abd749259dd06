//! Error types for awdl.
//!
//! Lower layers return these typed errors; the command layer wraps them in
//! `anyhow` context and the dispatcher maps them back to process exit codes
//! with [`exit_code`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Exit code for a generic failure.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for a command line usage error (sysexits `EX_USAGE`).
pub const EXIT_USAGE: u8 = 64;
/// Exit code when the managed interface does not exist (`EX_UNAVAILABLE`).
pub const EXIT_UNAVAILABLE: u8 = 69;
/// Exit code for marker or lock file access failures (`EX_IOERR`).
pub const EXIT_IOERR: u8 = 74;
/// Exit code when the daemon could not be started or stopped (`EX_TEMPFAIL`).
pub const EXIT_TEMPFAIL: u8 = 75;
/// Exit code when elevated privileges are missing (`EX_NOPERM`).
pub const EXIT_NOPERM: u8 = 77;
/// Exit code for an invalid configuration file (`EX_CONFIG`).
pub const EXIT_CONFIG: u8 = 78;

/// Failures of the privileged interface toggle and the status probe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error(
        "Permission denied while changing {0}.\n\
         This tool requires sudo privileges to manage network interfaces."
    )]
    PermissionDenied(String),

    #[error("Interface {0} not found (this machine may not have AWDL hardware)")]
    InterfaceNotFound(String),

    #[error("ifconfig failed for {interface}: {message}")]
    CommandFailed { interface: String, message: String },
}

#[derive(Error, Debug)]
pub enum AwdlError {
    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(
        "'awdl {0}' requires root privileges.\n\
         Please re-run with sudo: sudo awdl {0}"
    )]
    PermissionDenied(String),

    #[error("Persistence daemon already holds {}", path.display())]
    DaemonAlreadyRunning { path: PathBuf },

    #[error("Persistence daemon (PID {pid}) did not exit within {timeout:?}")]
    DaemonStopFailed { pid: u32, timeout: Duration },

    #[error("Persistence daemon failed to start: {0}")]
    DaemonStartFailed(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AwdlError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AwdlError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AwdlError::Controller(e) => controller_exit_code(e),
            AwdlError::PermissionDenied(_) => EXIT_NOPERM,
            AwdlError::DaemonAlreadyRunning { .. } => 0,
            AwdlError::DaemonStopFailed { .. } | AwdlError::DaemonStartFailed(_) => EXIT_TEMPFAIL,
            AwdlError::Io { .. } => EXIT_IOERR,
            AwdlError::Config(_) => EXIT_CONFIG,
        }
    }
}

fn controller_exit_code(err: &ControllerError) -> u8 {
    match err {
        ControllerError::PermissionDenied(_) => EXIT_NOPERM,
        ControllerError::InterfaceNotFound(_) => EXIT_UNAVAILABLE,
        ControllerError::CommandFailed { .. } => EXIT_FAILURE,
    }
}

/// Map an error chain to a process exit code.
///
/// The first typed cause found in the chain decides; anything else is a
/// generic failure.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<AwdlError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<ControllerError>() {
            return controller_exit_code(e);
        }
    }
    EXIT_FAILURE
}
