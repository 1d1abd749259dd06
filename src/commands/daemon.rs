//! Daemon entry point (`awdl daemon`, hidden).
//!
//! Started detached by `awdl disable`, or by launchd at boot. Holds the
//! marker lock for as long as it runs.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::daemon::{DaemonState, Persistence, RetryPolicy};
use crate::dispatcher::App;
use crate::error::AwdlError;
use crate::lock::MarkerLock;
use crate::signal::{ShutdownGuard, ShutdownToken};
use crate::utils::format_interval;

/// Run the persistence daemon in the foreground until SIGTERM/SIGINT.
pub async fn run(app: &App) -> Result<()> {
    let shutdown = ShutdownToken::new();
    let _guard = ShutdownGuard::new(shutdown.clone());
    run_until(app, &shutdown).await
}

/// Run the persistence daemon until `shutdown` is cancelled.
pub async fn run_until(app: &App, shutdown: &ShutdownToken) -> Result<()> {
    app.require_root("daemon")?;

    let interface = app.interface().to_string();
    let policy = RetryPolicy::from_config(&app.config)?;
    let marker_path = app.config.marker_path();

    let mut marker = match MarkerLock::acquire(&marker_path) {
        Ok(marker) => marker,
        Err(AwdlError::DaemonAlreadyRunning { .. }) => {
            info!(
                "Another persistence daemon already manages {}, exiting",
                interface
            );
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to acquire daemon marker"),
    };
    marker.write_state(&DaemonState::new(&interface, policy.interval))?;
    debug!("Holding daemon marker {:?}", marker.path());

    info!(
        "Persistence daemon started for {} (PID {}, every {}, max backoff {})",
        interface,
        std::process::id(),
        format_interval(policy.interval),
        format_interval(policy.max_backoff)
    );

    let report = Persistence::new(app.controller.clone(), interface.as_str(), policy)
        .run(shutdown)
        .await;

    info!(
        "Persistence daemon stopped: {} checks, {} re-disables, {} failures",
        report.ticks, report.reasserted, report.failures
    );

    // Releasing the marker is the signal to `awdl enable` that the loop is over.
    drop(marker);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autostart::Autostart;
    use crate::config::Config;
    use crate::daemon::{read_marker, DaemonCommand, MarkerContent, ProcessDaemon};
    use crate::error::EXIT_NOPERM;
    use crate::fs_abstraction::RealFileSystem;
    use crate::interface::mock::FakeInterface;
    use crate::interface::InterfaceState;
    use crate::lock;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn app_in(dir: &TempDir, fake: Arc<FakeInterface>, privileged: bool) -> App {
        let config = Config {
            run_dir: dir.path().join("run"),
            log_file: dir.path().join("awdl.log"),
            launchd_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let command = DaemonCommand::new(
            PathBuf::from("/nonexistent/bin/awdl"),
            &dir.path().join("config.yaml"),
            "awdl0",
            config.log_file.clone(),
        );

        App {
            daemon: Box::new(ProcessDaemon::new(
                config.marker_path(),
                command.clone(),
                Duration::from_millis(300),
                Duration::from_secs(5),
            )),
            autostart: Autostart::new(Arc::new(RealFileSystem), dir.path(), "awdl0", command),
            controller: fake,
            privileged,
            config,
        }
    }

    #[tokio::test]
    async fn test_second_daemon_exits_cleanly_when_marker_held() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeInterface::new(InterfaceState::Up));
        let app = app_in(&dir, fake.clone(), true);
        let marker = app.config.marker_path();

        let mut holder = MarkerLock::acquire(&marker).unwrap();
        let mut state = DaemonState::new("awdl0", Duration::from_secs(1));
        state.pid = 4242;
        holder.write_state(&state).unwrap();

        run_until(&app, &ShutdownToken::new()).await.unwrap();

        assert_eq!(read_marker(&marker).unwrap(), MarkerContent::State(state));
        assert!(lock::is_held(&marker).unwrap());
        assert!(fake.set_calls.lock().unwrap().is_empty());
        assert_eq!(fake.current(), InterfaceState::Up);
    }

    #[tokio::test]
    async fn test_marker_lives_exactly_as_long_as_the_loop() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeInterface::new(InterfaceState::Up));
        let app = app_in(&dir, fake.clone(), true);
        let marker = app.config.marker_path();
        let shutdown = ShutdownToken::new();

        let observe = async {
            let mut seen = None;
            for _ in 0..100 {
                if let MarkerContent::State(state) = read_marker(&marker).unwrap() {
                    if lock::is_held(&marker).unwrap() {
                        seen = Some(state);
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            // Still in place while the loop runs.
            tokio::time::sleep(Duration::from_millis(50)).await;
            let still_there = read_marker(&marker).unwrap();
            shutdown.cancel();
            (seen, still_there)
        };

        let (result, (seen, still_there)) = tokio::join!(run_until(&app, &shutdown), observe);
        result.unwrap();

        let seen = seen.expect("daemon never published a locked marker");
        assert_eq!(seen.pid, std::process::id());
        assert_eq!(seen.interface, "awdl0");
        assert_eq!(still_there, MarkerContent::State(seen));

        assert!(!marker.exists());
        assert!(!lock::is_held(&marker).unwrap());
        assert_eq!(fake.current(), InterfaceState::Down);
    }

    #[tokio::test]
    async fn test_daemon_requires_root() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeInterface::new(InterfaceState::Up));
        let app = app_in(&dir, fake.clone(), false);

        let err = run_until(&app, &ShutdownToken::new()).await.unwrap_err();

        assert_eq!(crate::error::exit_code(&err), EXIT_NOPERM);
        assert!(!app.config.marker_path().exists());
        assert_eq!(fake.current(), InterfaceState::Up);
    }
}
