//! # awdl - Keep Apple Wireless Direct Link disabled
//!
//! A small command line tool for macOS that turns the AWDL interface
//! (`awdl0`) off and keeps it off. macOS re-enables AWDL whenever AirDrop,
//! AirPlay or Continuity want it, so a one-shot `ifconfig awdl0 down` does
//! not last. `awdl disable` takes the interface down and starts a background
//! daemon that forces it down again every time it comes back up.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          awdl                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Dispatcher (clap)                                          │
//! │    └── Commands: status, disable, enable, help              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! │    └── Interface, polling interval, backoff, paths          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Interface Controller (InterfaceController trait)           │
//! │    └── IfconfigController: probe flags, set up/down         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Persistence Daemon (tokio)                                 │
//! │    ├── Detached process holding a locked marker file        │
//! │    └── Re-disable loop with exponential backoff on errors   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Autostart (launchd)                                        │
//! │    └── LaunchDaemon plist restarting the daemon at boot     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use awdl::interface::{AdminState, IfconfigController, InterfaceController};
//!
//! fn main() -> anyhow::Result<()> {
//!     let controller = IfconfigController::new("/sbin/ifconfig");
//!
//!     println!("awdl0 is {}", controller.probe("awdl0")?);
//!     controller.set_state("awdl0", AdminState::Down)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`autostart`] - launchd job that restarts the daemon at boot
//! - [`cli`] - Command-line interface definitions
//! - [`cmd_abstraction`] - External command execution (mockable)
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`daemon`] - Persistence daemon loop and process lifecycle
//! - [`dispatcher`] - Argument dispatch, wiring and exit codes
//! - [`error`] - Error types and exit code mapping
//! - [`fs_abstraction`] - Filesystem access (mockable)
//! - [`interface`] - Interface state probing and control
//! - [`lock`] - Locked marker file owned by the running daemon
//! - [`signal`] - Graceful shutdown signal handling
//! - [`utils`] - Common utility functions (formatting)

pub mod autostart;
pub mod cli;
pub mod cmd_abstraction;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod dispatcher;
pub mod error;
pub mod fs_abstraction;
pub mod interface;
pub mod lock;
pub mod signal;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::AwdlError;
