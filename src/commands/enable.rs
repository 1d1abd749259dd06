//! Enable command implementation.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::daemon::StopOutcome;
use crate::dispatcher::App;
use crate::interface::AdminState;

/// Run the enable command
pub async fn run(app: &App) -> Result<()> {
    app.require_root("enable")?;

    let interface = app.interface();
    info!("Enabling {}...", interface);

    // The daemon must be gone before the interface goes up, or its next
    // tick would undo this command.
    match app
        .daemon
        .stop()
        .await
        .context("Failed to stop persistence daemon")?
    {
        StopOutcome::Stopped(state) => info!("Persistence daemon (PID {}) stopped", state.pid),
        StopOutcome::NotRunning => debug!("No persistence daemon was running"),
    }

    app.autostart.remove()?;

    app.controller
        .set_state(interface, AdminState::Up)
        .with_context(|| format!("Failed to enable {}", interface))?;

    println!("[OK] AWDL enabled ({} up, persistence daemon stopped)", interface);
    Ok(())
}
