//! Status command implementation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::daemon::DaemonStatus;
use crate::dispatcher::App;
use crate::error::ControllerError;
use crate::interface::InterfaceState;
use crate::utils::{format_duration_ago, format_interval};

/// Everything `awdl status` reports, gathered without root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub interface: String,
    pub state: InterfaceState,
    /// Why the state is unknown, if the probe failed
    pub probe_error: Option<String>,
    pub daemon: DaemonStatus,
    pub start_at_boot: bool,
}

impl StatusReport {
    pub async fn collect(app: &App) -> Result<Self> {
        let interface = app.interface().to_string();

        let (state, probe_error) = match app.controller.probe(&interface) {
            Ok(state) => (state, None),
            Err(ControllerError::InterfaceNotFound(_)) => {
                (InterfaceState::Unknown, Some("interface not found".to_string()))
            }
            Err(e) => (InterfaceState::Unknown, Some(e.to_string())),
        };

        let daemon = app
            .daemon
            .status()
            .await
            .context("Failed to read persistence daemon state")?;

        Ok(Self {
            interface,
            state,
            probe_error,
            daemon,
            start_at_boot: app.autostart.is_installed(),
        })
    }

    /// One-word summary combining interface and daemon state.
    pub fn summary(&self) -> &'static str {
        let running = matches!(
            self.daemon,
            DaemonStatus::Running(_) | DaemonStatus::Starting
        );
        match (self.state, running) {
            (InterfaceState::Down, true) => "DISABLED",
            (InterfaceState::Down, false) => "DISABLED (not persistent)",
            (InterfaceState::Up, true) => "DISABLING",
            (InterfaceState::Up, false) => "ENABLED",
            (InterfaceState::Unknown, _) => "UNKNOWN",
        }
    }

    pub fn render(&self, now: DateTime<Utc>) -> String {
        let mut out = String::new();

        let _ = writeln!(out);
        let _ = writeln!(out, "AWDL: {}", self.summary());
        let _ = writeln!(out, "Interface: {}", self.interface);
        match &self.probe_error {
            Some(reason) => {
                let _ = writeln!(out, "Interface state: {} ({})", self.state, reason);
            }
            None => {
                let _ = writeln!(out, "Interface state: {}", self.state);
            }
        }

        match &self.daemon {
            DaemonStatus::Running(state) => {
                let _ = writeln!(
                    out,
                    "Persistence daemon: RUNNING (PID {}, started {}, every {})",
                    state.pid,
                    format_duration_ago(state.started_at, now),
                    format_interval(state.interval())
                );
            }
            DaemonStatus::Starting => {
                let _ = writeln!(out, "Persistence daemon: STARTING");
            }
            DaemonStatus::Stopped => {
                let _ = writeln!(out, "Persistence daemon: STOPPED");
            }
        }

        let _ = writeln!(
            out,
            "Start at boot: {}",
            if self.start_at_boot { "yes" } else { "no" }
        );
        let _ = writeln!(out);

        if self.state == InterfaceState::Down && matches!(self.daemon, DaemonStatus::Stopped) {
            let _ = writeln!(
                out,
                "macOS may re-enable AWDL at any time. Run 'sudo awdl disable' to keep it down."
            );
            let _ = writeln!(out);
        }

        out
    }
}

/// Run the status command
pub async fn run(app: &App) -> Result<()> {
    let report = StatusReport::collect(app).await?;
    print!("{}", report.render(Utc::now()));
    Ok(())
}
