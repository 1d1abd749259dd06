//! Command lifecycle tests.
//!
//! Drive `disable`, `enable` and `status` through the public API against an
//! in-memory interface and daemon, so they run without root or macOS.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use awdl::autostart::Autostart;
use awdl::cli::Commands;
use awdl::commands::status::StatusReport;
use awdl::config::Config;
use awdl::daemon::{
    DaemonCommand, DaemonControl, DaemonState, DaemonStatus, StartOutcome, StopOutcome,
};
use awdl::dispatcher::{execute, App};
use awdl::error::{self, AwdlError, ControllerError, EXIT_NOPERM};
use awdl::fs_abstraction::RealFileSystem;
use awdl::interface::{AdminState, InterfaceController, InterfaceState, Transition};

/// Interface whose admin state lives in memory.
struct FakeInterface {
    state: Mutex<InterfaceState>,
    transitions: Mutex<usize>,
}

impl FakeInterface {
    fn new(state: InterfaceState) -> Self {
        Self {
            state: Mutex::new(state),
            transitions: Mutex::new(0),
        }
    }

    fn current(&self) -> InterfaceState {
        *self.state.lock().unwrap()
    }

    fn transitions(&self) -> usize {
        *self.transitions.lock().unwrap()
    }
}

impl InterfaceController for FakeInterface {
    fn probe(&self, name: &str) -> Result<InterfaceState, ControllerError> {
        if name != "awdl0" {
            return Err(ControllerError::InterfaceNotFound(name.to_string()));
        }
        Ok(self.current())
    }

    fn set_state(&self, name: &str, desired: AdminState) -> Result<Transition, ControllerError> {
        if self.probe(name)? == InterfaceState::from(desired) {
            return Ok(Transition::Unchanged);
        }
        *self.state.lock().unwrap() = desired.into();
        *self.transitions.lock().unwrap() += 1;
        Ok(Transition::Changed)
    }
}

/// Daemon that exists only as a slot holding its state.
///
/// While running it keeps the shared interface down, standing in for the
/// persistence loop having already ticked.
struct FakeDaemon {
    interface: Arc<FakeInterface>,
    running: Mutex<Option<DaemonState>>,
    spawned: Mutex<u32>,
}

impl FakeDaemon {
    fn new(interface: Arc<FakeInterface>) -> Self {
        Self {
            interface,
            running: Mutex::new(None),
            spawned: Mutex::new(0),
        }
    }

    fn spawned(&self) -> u32 {
        *self.spawned.lock().unwrap()
    }
}

#[async_trait]
impl DaemonControl for FakeDaemon {
    async fn status(&self) -> Result<DaemonStatus, AwdlError> {
        Ok(match self.running.lock().unwrap().clone() {
            Some(state) => DaemonStatus::Running(state),
            None => DaemonStatus::Stopped,
        })
    }

    async fn ensure_running(&self) -> Result<StartOutcome, AwdlError> {
        let mut running = self.running.lock().unwrap();
        if let Some(state) = running.clone() {
            return Ok(StartOutcome::AlreadyRunning(state));
        }

        let mut spawned = self.spawned.lock().unwrap();
        *spawned += 1;
        let mut state = DaemonState::new("awdl0", Duration::from_secs(1));
        state.pid = 10_000 + *spawned;
        *running = Some(state.clone());

        let _ = self.interface.set_state("awdl0", AdminState::Down);
        Ok(StartOutcome::Started(state))
    }

    async fn stop(&self) -> Result<StopOutcome, AwdlError> {
        Ok(match self.running.lock().unwrap().take() {
            Some(state) => StopOutcome::Stopped(state),
            None => StopOutcome::NotRunning,
        })
    }
}

struct Harness {
    app: App,
    interface: Arc<FakeInterface>,
    daemon: Arc<FakeDaemon>,
    _dir: TempDir,
}

/// Forwards to a shared [`FakeDaemon`] so the test can inspect it.
struct SharedDaemon(Arc<FakeDaemon>);

#[async_trait]
impl DaemonControl for SharedDaemon {
    async fn status(&self) -> Result<DaemonStatus, AwdlError> {
        self.0.status().await
    }

    async fn ensure_running(&self) -> Result<StartOutcome, AwdlError> {
        self.0.ensure_running().await
    }

    async fn stop(&self) -> Result<StopOutcome, AwdlError> {
        self.0.stop().await
    }
}

fn harness(initial: InterfaceState, privileged: bool) -> Harness {
    let dir = TempDir::new().unwrap();
    let config = Config {
        run_dir: dir.path().join("run"),
        launchd_dir: dir.path().to_path_buf(),
        log_file: dir.path().join("awdl.log"),
        ..Config::default()
    };

    let interface = Arc::new(FakeInterface::new(initial));
    let daemon = Arc::new(FakeDaemon::new(interface.clone()));
    let command = DaemonCommand::new(
        "/usr/local/bin/awdl".into(),
        &dir.path().join("config.yaml"),
        "awdl0",
        config.log_file.clone(),
    );
    let autostart = Autostart::new(
        Arc::new(RealFileSystem),
        config.launchd_dir.clone(),
        "awdl0",
        command,
    );

    let app = App {
        config,
        controller: interface.clone(),
        daemon: Box::new(SharedDaemon(daemon.clone())),
        autostart,
        privileged,
    };

    Harness {
        app,
        interface,
        daemon,
        _dir: dir,
    }
}

fn disable() -> Commands {
    Commands::Disable { no_boot: false }
}

#[tokio::test]
async fn test_disable_takes_interface_down_and_starts_daemon() {
    let h = harness(InterfaceState::Up, true);

    execute(&h.app, &disable()).await.unwrap();

    assert_eq!(h.interface.current(), InterfaceState::Down);
    assert_eq!(h.daemon.spawned(), 1);
    assert!(h.app.autostart.is_installed());
}

#[tokio::test]
async fn test_disable_twice_keeps_single_daemon() {
    let h = harness(InterfaceState::Up, true);

    execute(&h.app, &disable()).await.unwrap();
    execute(&h.app, &disable()).await.unwrap();

    assert_eq!(h.interface.current(), InterfaceState::Down);
    assert_eq!(h.daemon.spawned(), 1);
    assert_eq!(h.interface.transitions(), 1);
}

#[tokio::test]
async fn test_disable_no_boot_skips_launchd_job() {
    let h = harness(InterfaceState::Up, true);

    execute(&h.app, &Commands::Disable { no_boot: true })
        .await
        .unwrap();

    assert_eq!(h.daemon.spawned(), 1);
    assert!(!h.app.autostart.is_installed());
}

#[tokio::test]
async fn test_enable_when_already_enabled_is_noop() {
    let h = harness(InterfaceState::Up, true);

    execute(&h.app, &Commands::Enable).await.unwrap();

    assert_eq!(h.interface.current(), InterfaceState::Up);
    assert_eq!(h.interface.transitions(), 0);
    assert_eq!(h.daemon.spawned(), 0);
}

#[tokio::test]
async fn test_disable_then_enable_round_trip() {
    let h = harness(InterfaceState::Up, true);

    execute(&h.app, &disable()).await.unwrap();
    execute(&h.app, &Commands::Enable).await.unwrap();

    assert_eq!(h.interface.current(), InterfaceState::Up);
    assert_eq!(
        h.app.daemon.status().await.unwrap(),
        DaemonStatus::Stopped
    );
    assert!(!h.app.autostart.is_installed());

    // A second round behaves like the first.
    execute(&h.app, &disable()).await.unwrap();
    assert_eq!(h.interface.current(), InterfaceState::Down);
    assert_eq!(h.daemon.spawned(), 2);
}

#[tokio::test]
async fn test_status_reflects_each_step() {
    let h = harness(InterfaceState::Up, true);

    let report = StatusReport::collect(&h.app).await.unwrap();
    assert_eq!(report.summary(), "ENABLED");
    assert!(!report.start_at_boot);

    execute(&h.app, &disable()).await.unwrap();
    let report = StatusReport::collect(&h.app).await.unwrap();
    assert_eq!(report.summary(), "DISABLED");
    assert_eq!(report.state, InterfaceState::Down);
    assert!(matches!(report.daemon, DaemonStatus::Running(_)));
    assert!(report.start_at_boot);

    execute(&h.app, &Commands::Enable).await.unwrap();
    let report = StatusReport::collect(&h.app).await.unwrap();
    assert_eq!(report.summary(), "ENABLED");
}

#[tokio::test]
async fn test_status_works_without_privileges() {
    let h = harness(InterfaceState::Down, false);

    execute(&h.app, &Commands::Status).await.unwrap();

    let report = StatusReport::collect(&h.app).await.unwrap();
    assert_eq!(report.summary(), "DISABLED (not persistent)");
}

#[tokio::test]
async fn test_status_unknown_interface() {
    let mut h = harness(InterfaceState::Up, false);
    h.app.config.interface = "awdl9".to_string();

    let report = StatusReport::collect(&h.app).await.unwrap();
    assert_eq!(report.state, InterfaceState::Unknown);
    assert_eq!(report.summary(), "UNKNOWN");
    assert!(report.probe_error.is_some());
}

#[tokio::test]
async fn test_disable_without_privileges_changes_nothing() {
    let h = harness(InterfaceState::Up, false);

    let err = execute(&h.app, &disable()).await.unwrap_err();

    assert_eq!(error::exit_code(&err), EXIT_NOPERM);
    assert!(err.to_string().contains("sudo awdl disable"));
    assert_eq!(h.interface.current(), InterfaceState::Up);
    assert_eq!(h.daemon.spawned(), 0);
}

#[tokio::test]
async fn test_enable_without_privileges_keeps_daemon() {
    let h = harness(InterfaceState::Up, true);
    execute(&h.app, &disable()).await.unwrap();

    let unprivileged = App {
        privileged: false,
        ..h.app
    };
    let err = execute(&unprivileged, &Commands::Enable)
        .await
        .unwrap_err();

    assert_eq!(error::exit_code(&err), EXIT_NOPERM);
    assert_eq!(h.interface.current(), InterfaceState::Down);
    assert_eq!(h.daemon.spawned(), 1);
    assert!(matches!(
        unprivileged.daemon.status().await.unwrap(),
        DaemonStatus::Running(_)
    ));
}
