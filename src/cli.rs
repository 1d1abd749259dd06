//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(name = "awdl")]
#[command(author, version, about = "Manage the Apple Wireless Direct Link (AWDL) interface")]
#[command(propagate_version = true, disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Interface to manage (overrides the config file)
    #[arg(short, long, global = true)]
    pub interface: Option<String>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Check current AWDL status
    Status,

    /// Start persistent AWDL disabling
    Disable {
        /// Do not install the launchd job that keeps AWDL disabled after a reboot
        #[arg(long)]
        no_boot: bool,
    },

    /// Re-enable AWDL and stop daemon
    Enable,

    /// Show all available commands
    Help,

    /// Run the persistence daemon in the foreground
    #[command(hide = true)]
    Daemon,
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Status => "status",
            Commands::Disable { .. } => "disable",
            Commands::Enable => "enable",
            Commands::Help => "help",
            Commands::Daemon => "daemon",
        }
    }
}
