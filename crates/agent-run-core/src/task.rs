//! The task seam: what a run executes, and how it is asked to stop.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Notify;

use crate::{LifecycleEvent, LifecycleObserver, LogSink};

/// Error raised by a task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task observed a stop request at one of its checkpoints.
    #[error("run interrupted by stop request")]
    Interrupted,
    /// The task failed for a task-specific reason.
    #[error("{0}")]
    Failed(String),
    /// I/O failure inside the task.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cooperative stop channel injected into a running task.
///
/// `request` delivers the signal once; delivery is inherently racy, since
/// the task only observes it at its own checkpoints. A task blocked away
/// from any checkpoint misses the delivery, so callers re-deliver on a
/// polling cadence until the task exits.
#[derive(Clone, Default)]
pub struct StopSignal {
    inner: Arc<SignalInner>,
}

#[derive(Default)]
struct SignalInner {
    requested: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    /// Create a fresh, un-requested signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver the stop signal. Idempotent.
    pub fn request(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Checkpoint for tasks: fails with `TaskError::Interrupted` once a
    /// stop has been requested.
    ///
    /// # Errors
    /// Returns `TaskError::Interrupted` if a stop was requested.
    pub fn checkpoint(&self) -> Result<(), TaskError> {
        if self.is_requested() {
            Err(TaskError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Resolve once a stop has been requested. Usable in `select!` arms
    /// so a task can remain interruptible while awaiting something else.
    pub async fn cancelled(&self) {
        loop {
            if self.is_requested() {
                return;
            }
            let notified = self.inner.notify.notified();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}

/// Everything a task may touch while running.
pub struct RunContext {
    /// Destination for the task's diagnostic output.
    pub sink: LogSink,
    /// Receiver for lifecycle notifications.
    pub observer: Arc<dyn LifecycleObserver>,
    /// Stop channel, checked at the task's own safe points.
    pub stop: StopSignal,
}

impl RunContext {
    /// Notify the observer of an internal agent step.
    pub fn agent_step<S: Into<String>>(&self, message: S) {
        self.observer.on_event(&LifecycleEvent::AgentStep {
            message: message.into(),
        });
    }

    /// Notify the observer of environment setup progress.
    pub fn env_update<S: Into<String>>(&self, message: S) {
        self.observer.on_event(&LifecycleEvent::EnvUpdate {
            message: message.into(),
        });
    }
}

/// An opaque agent run supplied by another subsystem.
///
/// Implementations are expected to call `ctx.stop.checkpoint()` (or await
/// `ctx.stop.cancelled()` in a `select!`) at their own safe points; a task
/// that never does so cannot be stopped and will block its caller's
/// `stop()` indefinitely.
#[async_trait]
pub trait AgentTask: Send + Sync {
    /// Execute the run to completion.
    ///
    /// # Errors
    /// Returns `TaskError::Interrupted` on a stop request, or any other
    /// variant on task failure.
    async fn run(&self, ctx: &RunContext) -> Result<(), TaskError>;
}

/// No-op agent that submits an empty result immediately.
///
/// Selected by the model name `instant_empty_submit`; used for test runs
/// that exercise the lifecycle without a real agent behind it.
pub struct InstantEmptySubmit;

#[async_trait]
impl AgentTask for InstantEmptySubmit {
    async fn run(&self, ctx: &RunContext) -> Result<(), TaskError> {
        ctx.stop.checkpoint()?;
        ctx.agent_step("Submitting empty result");
        Ok(())
    }
}
