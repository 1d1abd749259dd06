//! Launching the daemon as a detached background process.

use std::fs::OpenOptions;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::AwdlError;

/// How to start the daemon process: `<program> daemon --config ... --interface ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// File the daemon's stderr (its log output) is appended to
    pub log_file: PathBuf,
}

impl DaemonCommand {
    pub fn new(program: PathBuf, config_path: &Path, interface: &str, log_file: PathBuf) -> Self {
        Self {
            program,
            args: vec![
                "daemon".to_string(),
                "--config".to_string(),
                config_path.to_string_lossy().into_owned(),
                "--interface".to_string(),
                interface.to_string(),
            ],
            log_file,
        }
    }

    /// Command that re-runs the current executable as the daemon.
    pub fn for_current_exe(
        config_path: &Path,
        interface: &str,
        log_file: PathBuf,
    ) -> Result<Self, AwdlError> {
        let exe = std::env::current_exe().map_err(|e| AwdlError::io("current executable", e))?;
        Ok(Self::new(exe, config_path, interface, log_file))
    }
}

/// Spawn the daemon in a new session so it survives the CLI exiting.
///
/// Returns the child's pid. The child is not waited on; once the CLI exits
/// it is reparented to init.
pub fn spawn_detached(command: &DaemonCommand) -> Result<u32, AwdlError> {
    let stderr = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&command.log_file)
    {
        Ok(file) => Stdio::from(file),
        Err(e) => {
            warn!(
                "Cannot open daemon log {:?} ({}), daemon output will be discarded",
                command.log_file, e
            );
            Stdio::null()
        }
    };

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(stderr);

    // SAFETY: pre_exec runs after fork, before exec. setsid is
    // async-signal-safe and makes the child a session leader with no
    // controlling terminal.
    unsafe {
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    let child = cmd
        .spawn()
        .map_err(|e| AwdlError::DaemonStartFailed(format!("{:?}: {}", command.program, e)))?;

    debug!("Spawned persistence daemon with PID {}", child.id());
    Ok(child.id())
}
