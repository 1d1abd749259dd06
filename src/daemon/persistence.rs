//! The re-assertion loop run inside the daemon process.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AwdlError;
use crate::interface::{AdminState, InterfaceController, Transition};
use crate::signal::ShutdownToken;

/// Cap on the backoff exponent; 2^16 intervals is already far past any cap.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Delay schedule for the re-assertion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between re-assertions while the controller succeeds
    pub interval: Duration,
    /// Upper bound on the delay after consecutive failures
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Result<Self, AwdlError> {
        Ok(Self {
            interval: config.interval()?,
            max_backoff: config.max_backoff()?,
        })
    }

    /// Delay before the next attempt after `consecutive_failures` failures.
    ///
    /// Doubles per failure, never drops below the interval and never
    /// exceeds the cap.
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return self.interval;
        }
        let factor = 1u32 << consecutive_failures.min(MAX_BACKOFF_EXPONENT);
        self.interval
            .saturating_mul(factor)
            .min(self.max_backoff.max(self.interval))
    }
}

/// Counters for one run of the loop.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PersistenceReport {
    /// Controller calls made
    pub ticks: u64,
    /// Ticks that found the interface up and forced it down
    pub reasserted: u64,
    /// Ticks where the controller failed
    pub failures: u64,
}

/// Keeps an interface down until shut down.
pub struct Persistence {
    controller: Arc<dyn InterfaceController>,
    interface: String,
    policy: RetryPolicy,
}

impl Persistence {
    pub fn new(
        controller: Arc<dyn InterfaceController>,
        interface: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            controller,
            interface: interface.into(),
            policy,
        }
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// The interface is forced down once immediately, then again after each
    /// delay. Controller failures are logged and retried with backoff; they
    /// never end the loop.
    pub async fn run(&self, shutdown: &ShutdownToken) -> PersistenceReport {
        let mut report = PersistenceReport::default();
        let mut failures = 0u32;

        while !shutdown.is_cancelled() {
            failures = self.tick(&mut report, failures);

            let delay = self.policy.delay(failures);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!("Persistence loop for {} exited", self.interface);
        report
    }

    /// One re-assertion. Returns the updated consecutive failure count.
    fn tick(&self, report: &mut PersistenceReport, failures: u32) -> u32 {
        report.ticks += 1;
        match self.controller.set_state(&self.interface, AdminState::Down) {
            Ok(Transition::Changed) => {
                report.reasserted += 1;
                info!("{} was re-enabled, forced it down again", self.interface);
                0
            }
            Ok(Transition::Unchanged) => {
                if failures > 0 {
                    info!("{} reachable again after {} failures", self.interface, failures);
                }
                0
            }
            Err(e) => {
                report.failures += 1;
                let failures = failures.saturating_add(1);
                warn!(
                    "Failed to keep {} down (attempt {}, retrying in {:?}): {}",
                    self.interface,
                    failures,
                    self.policy.delay(failures),
                    e
                );
                failures
            }
        }
    }
}
