//! Run lifecycle notifications.
//!
//! The task's lifecycle callbacks are a closed set of variants dispatched
//! through one observer interface. The three families map to the parts of
//! the task that emit them: `RunStarted`/`RunFinished` for the overall run,
//! `AgentStep` for per-step progress, `EnvUpdate` for environment setup.

/// Why a run reached its terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The task ran to completion.
    Completed,
    /// The task was forcefully stopped by the user.
    Stopped,
    /// The task raised an error.
    Errored {
        /// Short summary shown to the observer.
        message: String,
        /// Full failure detail, logged at critical level.
        detail: String,
    },
}

/// A lifecycle notification emitted by a running task or its handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The run is starting.
    RunStarted,
    /// The run reached a terminal state.
    RunFinished { outcome: RunOutcome },
    /// The agent completed an internal step.
    AgentStep { message: String },
    /// Environment setup/teardown progressed.
    EnvUpdate { message: String },
}

/// Receiver for lifecycle notifications.
///
/// Dispatch is synchronous and must not block: implementations forward
/// best-effort and never push back on the running task.
pub trait LifecycleObserver: Send + Sync {
    /// Handle a lifecycle notification.
    fn on_event(&self, event: &LifecycleEvent);
}
