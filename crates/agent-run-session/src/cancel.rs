//! Forceful cancellation of a running task.

use std::time::{Duration, Instant};

use agent_run_core::StopSignal;
use thiserror::Error;

/// Cadence at which the stop signal is re-delivered.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cancellation policy.
///
/// The default has no deadline: a task that never reaches an interruptible
/// point blocks its canceller indefinitely. Setting `deadline` bounds the
/// wait and surfaces non-responsiveness as an error instead.
#[derive(Debug, Clone, Copy)]
pub struct CancelPolicy {
    /// Interval between signal deliveries and liveness checks.
    pub poll_interval: Duration,
    /// Optional upper bound on total elapsed time.
    pub deadline: Option<Duration>,
}

impl Default for CancelPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }
}

/// Cancellation error.
#[derive(Debug, Error)]
pub enum CancelError {
    #[error("task still alive after {0:?}; it may never reach an interruptible point")]
    DeadlineExceeded(Duration),
}

/// Repeatedly injects a stop signal into a running task until it exits.
///
/// A single delivery is not guaranteed to take effect: the task only
/// observes the signal at its own checkpoints. Persistence is what
/// provides eventual termination, and only if the task periodically
/// reaches such a point.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForcefulCanceller {
    policy: CancelPolicy,
}

impl ForcefulCanceller {
    /// Create a canceller with the given policy.
    #[must_use]
    pub const fn new(policy: CancelPolicy) -> Self {
        Self { policy }
    }

    /// Deliver the stop signal every poll tick until `is_alive` reports
    /// false. Blocks the caller for the whole duration.
    ///
    /// # Errors
    /// Returns `CancelError::DeadlineExceeded` if a deadline is configured
    /// and the task outlives it.
    pub async fn cancel<F>(&self, signal: &StopSignal, is_alive: F) -> Result<(), CancelError>
    where
        F: Fn() -> bool,
    {
        let started = Instant::now();
        while is_alive() {
            signal.request();
            if let Some(deadline) = self.policy.deadline {
                if started.elapsed() >= deadline {
                    return Err(CancelError::DeadlineExceeded(deadline));
                }
            }
            tokio::time::sleep(self.policy.poll_interval).await;
        }
        Ok(())
    }
}
