//! Command dispatcher: argument parsing, wiring and exit codes.

use std::ffi::OsString;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::FmtSubscriber;

use crate::autostart::Autostart;
use crate::cli::{Cli, Commands};
use crate::commands;
use crate::config::{validate_interface_name, Config};
use crate::daemon::{DaemonCommand, DaemonControl, ProcessDaemon};
use crate::error::{self, AwdlError, EXIT_USAGE};
use crate::fs_abstraction::real_fs;
use crate::interface::{is_root, IfconfigController, InterfaceController};

/// Everything a command needs, wired once per invocation.
pub struct App {
    pub config: Config,
    pub controller: Arc<dyn InterfaceController>,
    pub daemon: Box<dyn DaemonControl>,
    pub autostart: Autostart,
    /// Whether the process runs with root privileges
    pub privileged: bool,
}

impl App {
    /// Production wiring: ifconfig controller, detached daemon process,
    /// launchd job in the configured directory.
    pub fn from_config(config: Config, config_path: &Path) -> Result<Self> {
        let command = DaemonCommand::for_current_exe(
            config_path,
            &config.interface,
            config.log_file.clone(),
        )?;

        let daemon = ProcessDaemon::new(
            config.marker_path(),
            command.clone(),
            config.startup_timeout()?,
            config.stop_timeout()?,
        );
        let autostart = Autostart::new(
            Arc::new(*real_fs()),
            config.launchd_dir.clone(),
            &config.interface,
            command,
        );

        Ok(Self {
            controller: Arc::new(IfconfigController::new(config.ifconfig.clone())),
            daemon: Box::new(daemon),
            autostart,
            privileged: is_root(),
            config,
        })
    }

    pub fn interface(&self) -> &str {
        &self.config.interface
    }

    pub fn require_root(&self, command: &str) -> Result<(), AwdlError> {
        if self.privileged {
            Ok(())
        } else {
            Err(AwdlError::PermissionDenied(command.to_string()))
        }
    }
}

/// Parse `args`, run the command and return the process exit code.
pub async fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    ExitCode::from(run_code(args).await)
}

/// Same as [`run`], with the exit code as a plain number.
pub async fn run_code<I, T>(args: I) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => return parse_failure(e),
    };

    init_logging(&cli);

    let Some(command) = cli.command.clone() else {
        eprint!("{}", commands::help::usage());
        return EXIT_USAGE;
    };

    // help must work without root and without a readable config
    if command == Commands::Help {
        return finish(commands::help::run());
    }

    let result = match load_config(&cli).and_then(|config| App::from_config(config, &cli.config)) {
        Ok(app) => execute(&app, &command).await,
        Err(e) => Err(e),
    };
    finish(result)
}

/// Run one parsed command against an already wired [`App`].
pub async fn execute(app: &App, command: &Commands) -> Result<()> {
    match command {
        Commands::Status => commands::status::run(app).await,
        Commands::Disable { no_boot } => commands::disable::run(app, *no_boot).await,
        Commands::Enable => commands::enable::run(app).await,
        Commands::Help => commands::help::run(),
        Commands::Daemon => commands::daemon::run(app).await,
    }
}

/// Load the config file (or defaults) and apply command line overrides.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(interface) = &cli.interface {
        validate_interface_name(interface)?;
        config.interface = interface.clone();
    }
    Ok(config)
}

fn finish(result: Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            error::exit_code(&e)
        }
    }
}

fn parse_failure(err: clap::Error) -> u8 {
    use clap::error::ErrorKind;

    let _ = err.print();
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => {
            eprintln!("Run 'awdl help' to see all available commands.");
            EXIT_USAGE
        }
    }
}

/// Setup logging based on verbosity.
fn init_logging(cli: &Cli) {
    // Fails only if a subscriber is already installed (repeated runs in tests).
    let _ = tracing::subscriber::set_global_default(build_subscriber(cli, std::io::stderr));
}

/// The daemon's stderr is its log file, so only the daemon gets timestamps
/// and it never gets colour codes.
fn build_subscriber<W>(cli: &Cli, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(writer);

    if cli.command == Some(Commands::Daemon) {
        Box::new(builder.with_ansi(false).finish())
    } else {
        Box::new(builder.without_time().finish())
    }
}
