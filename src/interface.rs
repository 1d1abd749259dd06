//! Interface controller: probe and toggle the managed network interface.
//!
//! State is always read from the OS on demand. Nothing here caches the last
//! observed state, so the CLI and the daemon process can never disagree
//! about a stale value.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use crate::cmd_abstraction::{args_to_strings, CommandExecutor, CommandOutput, RealCommandExecutor};
use crate::error::ControllerError;

/// Last observed state of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceState {
    Up,
    Down,
    /// The interface could not be probed or reported no flags.
    Unknown,
}

impl InterfaceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceState::Up => "UP",
            InterfaceState::Down => "DOWN",
            InterfaceState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for InterfaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired administrative state for [`InterfaceController::set_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminState {
    Up,
    Down,
}

impl AdminState {
    /// The ifconfig keyword for this state.
    pub fn as_arg(&self) -> &'static str {
        match self {
            AdminState::Up => "up",
            AdminState::Down => "down",
        }
    }
}

impl From<AdminState> for InterfaceState {
    fn from(state: AdminState) -> Self {
        match state {
            AdminState::Up => InterfaceState::Up,
            AdminState::Down => InterfaceState::Down,
        }
    }
}

/// Whether a set operation had to change anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Changed,
}

/// Probe and toggle a named interface.
pub trait InterfaceController: Send + Sync {
    /// Read the current state without elevated privileges.
    fn probe(&self, name: &str) -> Result<InterfaceState, ControllerError>;

    /// Bring the interface to `desired`.
    ///
    /// Setting a state that is already in effect is a successful no-op.
    fn set_state(&self, name: &str, desired: AdminState) -> Result<Transition, ControllerError>;
}

/// Controller backed by the platform `ifconfig` tool.
pub struct IfconfigController<E: CommandExecutor = RealCommandExecutor> {
    executor: E,
    program: String,
}

impl IfconfigController<RealCommandExecutor> {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::with_executor(RealCommandExecutor::new(), program)
    }
}

impl<E: CommandExecutor> IfconfigController<E> {
    pub fn with_executor(executor: E, program: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            program: program.into().to_string_lossy().into_owned(),
        }
    }

    fn run(&self, name: &str, args: &[&str]) -> Result<CommandOutput, ControllerError> {
        self.executor
            .execute(&self.program, &args_to_strings(args))
            .map_err(|e| ControllerError::CommandFailed {
                interface: name.to_string(),
                message: format!("{:#}", e),
            })
    }
}

impl<E: CommandExecutor> InterfaceController for IfconfigController<E> {
    fn probe(&self, name: &str) -> Result<InterfaceState, ControllerError> {
        let output = self.run(name, &[name])?;
        if !output.success {
            return Err(classify_failure(name, &output));
        }
        Ok(parse_flags(&output.stdout))
    }

    fn set_state(&self, name: &str, desired: AdminState) -> Result<Transition, ControllerError> {
        let current = self.probe(name)?;
        if current == InterfaceState::from(desired) {
            debug!("{} already {}", name, current);
            return Ok(Transition::Unchanged);
        }

        let output = self.run(name, &[name, desired.as_arg()])?;
        if !output.success {
            return Err(classify_failure(name, &output));
        }

        debug!("{} set {}", name, desired.as_arg());
        Ok(Transition::Changed)
    }
}

/// Extract the interface state from `ifconfig <name>` output.
///
/// Both BSD and net-tools print a `flags=NNNN<UP,BROADCAST,...>` list on the
/// first line; `UP` in that list means the interface is administratively up.
pub fn parse_flags(output: &str) -> InterfaceState {
    let Some(start) = output.find("flags=") else {
        return InterfaceState::Unknown;
    };
    let rest = &output[start..];
    let (Some(open), Some(close)) = (rest.find('<'), rest.find('>')) else {
        return InterfaceState::Unknown;
    };
    if close < open {
        return InterfaceState::Unknown;
    }

    if rest[open + 1..close].split(',').any(|flag| flag.trim() == "UP") {
        InterfaceState::Up
    } else {
        InterfaceState::Down
    }
}

/// Map failed ifconfig output to a controller error.
fn classify_failure(name: &str, output: &CommandOutput) -> ControllerError {
    let message = output.diagnostic();
    let lower = message.to_lowercase();

    if lower.contains("operation not permitted")
        || lower.contains("permission denied")
        || lower.contains("must be root")
    {
        ControllerError::PermissionDenied(name.to_string())
    } else if lower.contains("does not exist")
        || lower.contains("device not found")
        || lower.contains("no such device")
    {
        ControllerError::InterfaceNotFound(name.to_string())
    } else {
        ControllerError::CommandFailed {
            interface: name.to_string(),
            message,
        }
    }
}

/// Check if running as root (effective UID == 0)
pub fn is_root() -> bool {
    // SAFETY: geteuid() has no preconditions and never fails.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(test)]
pub mod mock {
    //! In-memory controller for tests of the daemon loop and commands.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub struct FakeInterface {
        pub state: Mutex<InterfaceState>,
        pub set_calls: Mutex<Vec<AdminState>>,
        /// Errors returned by upcoming `set_state` calls, in order.
        pub failures: Mutex<VecDeque<ControllerError>>,
    }

    impl FakeInterface {
        pub fn new(state: InterfaceState) -> Self {
            Self {
                state: Mutex::new(state),
                set_calls: Mutex::new(Vec::new()),
                failures: Mutex::new(VecDeque::new()),
            }
        }

        pub fn current(&self) -> InterfaceState {
            *self.state.lock().unwrap()
        }

        /// Simulate the OS flipping the interface behind our back.
        pub fn force(&self, state: InterfaceState) {
            *self.state.lock().unwrap() = state;
        }

        pub fn fail_next(&self, err: ControllerError) {
            self.failures.lock().unwrap().push_back(err);
        }
    }

    impl InterfaceController for FakeInterface {
        fn probe(&self, _name: &str) -> Result<InterfaceState, ControllerError> {
            Ok(self.current())
        }

        fn set_state(
            &self,
            _name: &str,
            desired: AdminState,
        ) -> Result<Transition, ControllerError> {
            self.set_calls.lock().unwrap().push(desired);
            if let Some(err) = self.failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            let mut state = self.state.lock().unwrap();
            if *state == InterfaceState::from(desired) {
                return Ok(Transition::Unchanged);
            }
            *state = desired.into();
            Ok(Transition::Changed)
        }
    }
}
