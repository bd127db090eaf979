//! Session registry: at most one live run per session.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use agent_run_core::{AgentTask, EventBridge, EventStore, LogSink, SessionId};
use tokio::sync::Mutex as AsyncMutex;

use crate::{
    cancel::{CancelError, CancelPolicy},
    handle::RunHandle,
};

/// Registry error.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to stop superseded run: {0}")]
    Cancel(#[from] CancelError),
}

struct SessionSlot {
    store: Arc<EventStore>,
    run: AsyncMutex<Option<Arc<RunHandle>>>,
}

impl SessionSlot {
    fn new() -> Self {
        Self {
            store: Arc::new(EventStore::new()),
            run: AsyncMutex::new(None),
        }
    }
}

/// Maps session identifiers to their current run.
///
/// Lock discipline: the map itself is behind a plain mutex held only long
/// enough to fetch or insert a slot, never across an await. Each slot
/// carries its own async mutex, held across the supersede stop, so two
/// concurrent starts for one session serialize while operations on
/// unrelated sessions stay independent — one wedged stop cannot block the
/// rest of the control surface. The registry is plain state passed into
/// request handlers, never a process-wide singleton.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<SessionSlot>>>,
    policy: CancelPolicy,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(CancelPolicy::default())
    }
}

impl SessionRegistry {
    /// Create a registry whose runs stop with the given policy.
    #[must_use]
    pub fn new(policy: CancelPolicy) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            policy,
        }
    }

    fn slot(&self, session_id: SessionId) -> Arc<SessionSlot> {
        Arc::clone(
            self.sessions
                .lock()
                .unwrap()
                .entry(session_id)
                .or_insert_with(|| Arc::new(SessionSlot::new())),
        )
    }

    fn existing_slot(&self, session_id: SessionId) -> Option<Arc<SessionSlot>> {
        self.sessions.lock().unwrap().get(&session_id).cloned()
    }

    /// Outward event store for a session, created on first use.
    ///
    /// Observers may subscribe before any run has started.
    #[must_use]
    pub fn event_store(&self, session_id: SessionId) -> Arc<EventStore> {
        Arc::clone(&self.slot(session_id).store)
    }

    /// Start a run for the session, superseding any live predecessor.
    ///
    /// A live predecessor is stopped to completion first, so its terminal
    /// "stopped" event precedes the new run's start event in per-session
    /// order. Returns as soon as the new run is spawned; it never waits
    /// for the run to finish.
    ///
    /// # Errors
    /// Returns an error if stopping the superseded run exceeds a
    /// configured deadline; the predecessor then stays registered and no
    /// new run is started.
    pub async fn start_run(
        &self,
        session_id: SessionId,
        task: Arc<dyn AgentTask>,
    ) -> Result<Arc<RunHandle>, RegistryError> {
        let slot = self.slot(session_id);
        let mut run = slot.run.lock().await;

        if let Some(old) = run.as_ref() {
            if old.is_alive() {
                tracing::info!(%session_id, "superseding live run");
                old.stop().await?;
            }
        }

        let observer = Arc::new(EventBridge::new(Arc::clone(&slot.store)));
        let sink = LogSink::new(Arc::clone(&slot.store));
        let handle = Arc::new(RunHandle::spawn(task, observer, sink, self.policy));
        *run = Some(Arc::clone(&handle));

        Ok(handle)
    }

    /// Stop the session's run, blocking until it has exited.
    ///
    /// A missing or already-dead run is a no-op. Returns whether a live
    /// run was actually stopped.
    ///
    /// # Errors
    /// Returns an error if the stop exceeds a configured deadline.
    pub async fn stop_run(&self, session_id: SessionId) -> Result<bool, RegistryError> {
        let Some(slot) = self.existing_slot(session_id) else {
            tracing::debug!(%session_id, "no session registered");
            return Ok(false);
        };
        let run = slot.run.lock().await;
        let Some(run) = run.as_ref() else {
            tracing::debug!(%session_id, "no run registered");
            return Ok(false);
        };
        if !run.is_alive() {
            tracing::debug!(%session_id, "run already finished");
            return Ok(false);
        }
        run.stop().await?;
        Ok(true)
    }

    /// Current run handle for a session, if any.
    pub async fn run_handle(&self, session_id: SessionId) -> Option<Arc<RunHandle>> {
        let slot = self.existing_slot(session_id)?;
        let run = slot.run.lock().await;
        run.clone()
    }
}
