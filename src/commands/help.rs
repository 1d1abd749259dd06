//! Help command implementation.
//!
//! Prints a fixed command table. It needs neither root nor a config file,
//! which makes `awdl help` usable as an installation self-test.

use anyhow::Result;

/// The documented command surface.
pub const COMMAND_TABLE: &str = "\
Usage:
  awdl status    # Check current AWDL status
  awdl disable   # Start persistent AWDL disabling
  awdl enable    # Re-enable AWDL and stop daemon
  awdl help      # Show all available commands
";

const OPTIONS: &str = "\
Options:
  -c, --config <PATH>     Config file (default: /etc/awdl/config.yaml)
  -i, --interface <NAME>  Interface to manage (default: awdl0)
  -q, --quiet             Errors only
  -v, --verbose           Debug output
      --no-boot           With disable: do not keep AWDL disabled after a reboot
";

const NOTE: &str = "\
Note: This tool requires sudo privileges to manage network interfaces.
Disabling AWDL will affect AirDrop, AirPlay, and other Apple services.
";

/// Full help text.
pub fn usage() -> String {
    format!(
        "AWDL Command Line Tool {}\n\n{}\n{}\n{}",
        env!("CARGO_PKG_VERSION"),
        COMMAND_TABLE,
        OPTIONS,
        NOTE
    )
}

/// Run the help command
pub fn run() -> Result<()> {
    print!("{}", usage());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_lists_every_command() {
        let text = usage();
        for command in ["status", "disable", "enable", "help"] {
            assert!(
                text.contains(&format!("awdl {}", command)),
                "missing {}",
                command
            );
        }
    }

    #[test]
    fn test_usage_mentions_sudo_and_side_effects() {
        let text = usage();
        assert!(text.contains("sudo"));
        assert!(text.contains("AirDrop"));
    }

    #[test]
    fn test_usage_has_version() {
        assert!(usage().contains(env!("CARGO_PKG_VERSION")));
    }
}
