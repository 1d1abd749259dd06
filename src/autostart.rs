//! Boot persistence via a launchd job.
//!
//! `awdl disable` installs a LaunchDaemon that starts the persistence daemon
//! at boot, and `awdl enable` removes it. The job is only written; it is not
//! loaded into the running launchd, because `disable` has already started
//! the daemon for the current boot.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::daemon::DaemonCommand;
use crate::fs_abstraction::FileSystem;

/// launchd label prefix; the interface name is appended.
const LABEL_PREFIX: &str = "dev.awdl.persistence";

/// LaunchDaemons must be root-owned and not group/world writable.
const PLIST_MODE: u32 = 0o644;

pub struct Autostart {
    fs: Arc<dyn FileSystem>,
    launchd_dir: PathBuf,
    label: String,
    command: DaemonCommand,
}

impl Autostart {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        launchd_dir: impl Into<PathBuf>,
        interface: &str,
        command: DaemonCommand,
    ) -> Self {
        Self {
            fs,
            launchd_dir: launchd_dir.into(),
            label: format!("{}.{}", LABEL_PREFIX, interface),
            command,
        }
    }

    pub fn plist_path(&self) -> PathBuf {
        self.launchd_dir.join(format!("{}.plist", self.label))
    }

    pub fn is_installed(&self) -> bool {
        self.fs.exists(&self.plist_path())
    }

    /// Write the launchd job. Returns false when this host has no
    /// LaunchDaemons directory (not macOS) and nothing was written.
    pub fn install(&self) -> Result<bool> {
        if !self.fs.is_dir(&self.launchd_dir) {
            debug!(
                "{:?} not found, skipping boot persistence",
                self.launchd_dir
            );
            return Ok(false);
        }

        let path = self.plist_path();
        let plist = generate_plist(&self.label, &self.command);
        self.fs
            .write(&path, plist.as_bytes())
            .with_context(|| format!("Failed to write launchd job {:?}", path))?;
        self.fs
            .set_permissions_mode(&path, PLIST_MODE)
            .with_context(|| format!("Failed to set permissions on {:?}", path))?;

        info!("Installed launchd job {}", self.label);
        Ok(true)
    }

    /// Remove the launchd job. Returns false if it was not installed.
    pub fn remove(&self) -> Result<bool> {
        let path = self.plist_path();
        if !self.fs.exists(&path) {
            return Ok(false);
        }
        self.fs
            .remove_file(&path)
            .with_context(|| format!("Failed to remove launchd job {:?}", path))?;

        info!("Removed launchd job {}", self.label);
        Ok(true)
    }
}

/// Generate the LaunchDaemon property list
fn generate_plist(label: &str, command: &DaemonCommand) -> String {
    let mut arguments = format!(
        "        <string>{}</string>\n",
        xml_escape(&command.program.to_string_lossy())
    );
    for arg in &command.args {
        arguments.push_str(&format!("        <string>{}</string>\n", xml_escape(arg)));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
{arguments}    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <false/>
    <key>StandardErrorPath</key>
    <string>{log}</string>
</dict>
</plist>
"#,
        label = xml_escape(label),
        arguments = arguments,
        log = xml_escape(&command.log_file.to_string_lossy()),
    )
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
