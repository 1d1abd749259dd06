//! Configuration management for awdl.
//!
//! The configuration file is optional: every field has a default, and a
//! missing file means "use the defaults".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AwdlError;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/awdl/config.yaml";

/// Maximum interface name length (IFNAMSIZ minus the trailing NUL)
const MAX_INTERFACE_NAME_LEN: usize = 15;

const MIN_INTERVAL: Duration = Duration::from_millis(100);
const MAX_INTERVAL: Duration = Duration::from_secs(60);

/// Parse a duration string such as "500ms", "1s" or "2m".
///
/// Only ASCII input with a known suffix and an integer amount is accepted.
pub fn parse_duration(value: &str) -> Option<Duration> {
    if !value.is_ascii() {
        return None;
    }
    let (amount, unit) = if let Some(n) = value.strip_suffix("ms") {
        (n, "ms")
    } else if let Some(n) = value.strip_suffix('s') {
        (n, "s")
    } else if let Some(n) = value.strip_suffix('m') {
        (n, "m")
    } else {
        return None;
    };
    let amount: u64 = amount.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        _ => amount.checked_mul(60).map(Duration::from_secs),
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Interface to manage
    pub interface: String,

    /// Delay between re-assertions of the disabled state
    pub interval: String,

    /// Upper bound for the delay after repeated failures
    pub max_backoff: String,

    /// How long `enable` waits for the daemon to exit
    pub stop_timeout: String,

    /// How long `disable` waits for a freshly spawned daemon to report in
    pub startup_timeout: String,

    /// Directory holding the daemon marker file
    pub run_dir: PathBuf,

    /// Daemon log file (the daemon's stderr)
    pub log_file: PathBuf,

    /// Path to the ifconfig binary
    pub ifconfig: PathBuf,

    /// Install a launchd job so the daemon restarts at boot
    pub start_at_boot: bool,

    /// Directory for launchd job definitions
    pub launchd_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interface: "awdl0".to_string(),
            interval: "1s".to_string(),
            max_backoff: "30s".to_string(),
            stop_timeout: "5s".to_string(),
            startup_timeout: "5s".to_string(),
            run_dir: PathBuf::from("/var/run/awdl"),
            log_file: PathBuf::from("/var/log/awdl.log"),
            ifconfig: PathBuf::from("/sbin/ifconfig"),
            start_at_boot: true,
            launchd_dir: PathBuf::from("/Library/LaunchDaemons"),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| AwdlError::Config(format!("{}: {}", path.display(), e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the configuration file if it exists, defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config file at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), AwdlError> {
        validate_interface_name(&self.interface)?;

        let interval = self.interval()?;
        if !(MIN_INTERVAL..=MAX_INTERVAL).contains(&interval) {
            return Err(AwdlError::Config(format!(
                "interval must be between {:?} and {:?}, got {:?}",
                MIN_INTERVAL, MAX_INTERVAL, interval
            )));
        }
        if self.max_backoff()? < interval {
            return Err(AwdlError::Config(
                "max_backoff must not be shorter than interval".to_string(),
            ));
        }
        if self.stop_timeout()?.is_zero() || self.startup_timeout()?.is_zero() {
            return Err(AwdlError::Config(
                "stop_timeout and startup_timeout must be greater than zero".to_string(),
            ));
        }

        for (name, path) in [
            ("run_dir", &self.run_dir),
            ("log_file", &self.log_file),
            ("ifconfig", &self.ifconfig),
            ("launchd_dir", &self.launchd_dir),
        ] {
            if !path.is_absolute() {
                return Err(AwdlError::Config(format!(
                    "{} must be an absolute path, got {:?}",
                    name, path
                )));
            }
        }

        Ok(())
    }

    pub fn interval(&self) -> Result<Duration, AwdlError> {
        duration_field("interval", &self.interval)
    }

    pub fn max_backoff(&self) -> Result<Duration, AwdlError> {
        duration_field("max_backoff", &self.max_backoff)
    }

    pub fn stop_timeout(&self) -> Result<Duration, AwdlError> {
        duration_field("stop_timeout", &self.stop_timeout)
    }

    pub fn startup_timeout(&self) -> Result<Duration, AwdlError> {
        duration_field("startup_timeout", &self.startup_timeout)
    }

    /// Marker file identifying the live daemon for the managed interface.
    pub fn marker_path(&self) -> PathBuf {
        self.run_dir.join(format!("{}.pid", self.interface))
    }
}

fn duration_field(name: &str, value: &str) -> Result<Duration, AwdlError> {
    parse_duration(value).ok_or_else(|| {
        AwdlError::Config(format!(
            "{} has invalid duration {:?} (expected e.g. 500ms, 1s, 2m)",
            name, value
        ))
    })
}

/// Interface names end up as ifconfig arguments and file names.
pub fn validate_interface_name(name: &str) -> Result<(), AwdlError> {
    if name.is_empty() || name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(AwdlError::Config(format!(
            "interface name must be 1-{} characters, got {:?}",
            MAX_INTERFACE_NAME_LEN, name
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AwdlError::Config(format!(
            "interface name must be ASCII alphanumeric, got {:?}",
            name
        )));
    }
    Ok(())
}
