//! Run status tracking with monotone transitions.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Lifecycle state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created but not yet spawned.
    Idle,
    /// Task is executing.
    Running,
    /// A stop was requested; the task has not yet exited.
    StopRequested,
    /// Task ran to completion.
    Finished,
    /// Task raised an error.
    Failed,
    /// Task was forcefully stopped.
    Stopped,
}

impl RunStatus {
    /// Whether this state is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Stopped)
    }

    const fn can_advance_to(self, next: Self) -> bool {
        match self {
            Self::Idle => matches!(next, Self::Running),
            Self::Running => {
                matches!(
                    next,
                    Self::StopRequested | Self::Finished | Self::Failed | Self::Stopped
                )
            }
            Self::StopRequested => {
                matches!(next, Self::Finished | Self::Failed | Self::Stopped)
            }
            // No transition out of a terminal state.
            Self::Finished | Self::Failed | Self::Stopped => false,
        }
    }
}

/// Thread-safe status cell enforcing monotone transitions.
///
/// `Idle → Running → exactly one of {Finished, Failed, Stopped}`, with
/// `StopRequested` as the only intermediate. The first terminal transition
/// wins; later attempts are rejected, which is what callers racing a
/// natural completion against a forced stop rely on.
pub struct StatusCell {
    state: Mutex<RunStatus>,
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCell {
    /// Create a cell in the `Idle` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RunStatus::Idle),
        }
    }

    /// Current state.
    #[must_use]
    pub fn get(&self) -> RunStatus {
        *self.state.lock().unwrap()
    }

    /// Attempt a transition; returns whether it was applied.
    pub fn advance(&self, next: RunStatus) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.can_advance_to(next) {
            *state = next;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let cell = StatusCell::new();
        assert!(cell.advance(RunStatus::Running));
        assert!(cell.advance(RunStatus::Finished));
        assert_eq!(cell.get(), RunStatus::Finished);
    }

    #[test]
    fn test_terminal_state_is_final() {
        let cell = StatusCell::new();
        assert!(cell.advance(RunStatus::Running));
        assert!(cell.advance(RunStatus::Failed));
        assert!(!cell.advance(RunStatus::Stopped));
        assert!(!cell.advance(RunStatus::Running));
        assert_eq!(cell.get(), RunStatus::Failed);
    }

    #[test]
    fn test_stop_requested_still_allows_natural_finish() {
        let cell = StatusCell::new();
        assert!(cell.advance(RunStatus::Running));
        assert!(cell.advance(RunStatus::StopRequested));
        assert!(cell.advance(RunStatus::Finished));
        assert!(!cell.advance(RunStatus::Stopped));
    }

    #[test]
    fn test_cannot_skip_running() {
        let cell = StatusCell::new();
        assert!(!cell.advance(RunStatus::Finished));
        assert_eq!(cell.get(), RunStatus::Idle);
    }
}
