//! The seam between the control surface and the agent subsystem.

use std::sync::Arc;

use agent_run_config::RunSpec;
use agent_run_core::{AgentTask, InstantEmptySubmit};

/// Constructs the opaque agent task for a resolved run spec.
///
/// The task's internals are another subsystem's concern; the control
/// surface only ever starts, observes, and stops what this returns.
pub trait TaskFactory: Send + Sync {
    /// Build the task for one run.
    fn create(&self, spec: &RunSpec) -> Arc<dyn AgentTask>;
}

/// Factory serving the no-op instant-submit agent for every spec.
///
/// Useful for wiring tests and for deployments that only exercise the
/// lifecycle itself.
pub struct InstantSubmitFactory;

impl TaskFactory for InstantSubmitFactory {
    fn create(&self, _spec: &RunSpec) -> Arc<dyn AgentTask> {
        Arc::new(InstantEmptySubmit)
    }
}
