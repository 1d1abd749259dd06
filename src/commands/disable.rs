//! Disable command implementation.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::daemon::StartOutcome;
use crate::dispatcher::App;
use crate::interface::{AdminState, Transition};

/// Run the disable command
///
/// Takes the interface down right away, then makes sure the persistence
/// daemon is running to keep it down.
pub async fn run(app: &App, no_boot: bool) -> Result<()> {
    app.require_root("disable")?;

    let interface = app.interface();
    info!("Disabling {}...", interface);

    match app
        .controller
        .set_state(interface, AdminState::Down)
        .with_context(|| format!("Failed to disable {}", interface))?
    {
        Transition::Changed => info!("{} is now down", interface),
        Transition::Unchanged => debug!("{} was already down", interface),
    }

    let daemon = match app
        .daemon
        .ensure_running()
        .await
        .context("Failed to start persistence daemon")?
    {
        StartOutcome::Started(state) => {
            info!("Persistence daemon started (PID {})", state.pid);
            state
        }
        StartOutcome::AlreadyRunning(state) => {
            info!("Persistence daemon already running (PID {})", state.pid);
            state
        }
    };

    if app.config.start_at_boot && !no_boot && app.autostart.install()? {
        info!("AWDL will stay disabled after a reboot");
    }

    println!(
        "[OK] AWDL disabled ({} down, persistence daemon PID {})",
        interface, daemon.pid
    );
    Ok(())
}
