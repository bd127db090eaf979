//! Broadcast + history event store backing a session's outward channel.

use std::{
    collections::VecDeque,
    sync::{Arc, RwLock},
};

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::{LogLevel, RunEvent};

/// Default history size limit (100 MB).
const HISTORY_BYTES: usize = 100_000 * 1024;

#[derive(Clone)]
struct StoredEvent {
    event: RunEvent,
    bytes: usize,
}

struct Inner {
    history: VecDeque<StoredEvent>,
    total_bytes: usize,
}

/// Event store with broadcast and history support.
///
/// Observers that connect mid-run receive the history first and then
/// seamlessly switch to live updates. Events pushed by one run are
/// delivered in emission order; nothing is guaranteed across runs.
pub struct EventStore {
    inner: RwLock<Inner>,
    sender: broadcast::Sender<RunEvent>,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    /// Create a new event store.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(10000);
        Self {
            inner: RwLock::new(Inner {
                history: VecDeque::with_capacity(32),
                total_bytes: 0,
            }),
            sender,
        }
    }

    /// Push an event to both live listeners and history.
    pub fn push(&self, event: RunEvent) {
        let _ = self.sender.send(event.clone()); // live listeners
        let bytes = event.approx_bytes();

        let mut inner = self.inner.write().unwrap();
        while inner.total_bytes.saturating_add(bytes) > HISTORY_BYTES {
            if let Some(front) = inner.history.pop_front() {
                inner.total_bytes = inner.total_bytes.saturating_sub(front.bytes);
            } else {
                break;
            }
        }
        inner.history.push_back(StoredEvent { event, bytes });
        inner.total_bytes = inner.total_bytes.saturating_add(bytes);
    }

    /// Push an agent progress update.
    pub fn push_agent<S: Into<String>>(&self, text: S) {
        self.push(RunEvent::AgentUpdate { text: text.into() });
    }

    /// Push a log line at the given level.
    pub fn push_log<S: Into<String>>(&self, text: S, level: LogLevel) {
        self.push(RunEvent::LogUpdate {
            text: text.into(),
            level,
        });
    }

    /// Push an environment status update.
    pub fn push_env<S: Into<String>>(&self, text: S) {
        self.push(RunEvent::EnvUpdate { text: text.into() });
    }

    /// Push the terminal notification for a run.
    pub fn push_finished(&self) {
        self.push(RunEvent::RunFinished);
    }

    /// Get a receiver for live updates.
    #[must_use]
    pub fn get_receiver(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    /// Get a snapshot of the history.
    #[must_use]
    pub fn get_history(&self) -> Vec<RunEvent> {
        self.inner
            .read()
            .unwrap()
            .history
            .iter()
            .map(|s| s.event.clone())
            .collect()
    }

    /// Stream that yields history first, then live updates.
    #[must_use]
    pub fn history_plus_stream(&self) -> futures::stream::BoxStream<'static, RunEvent> {
        let (history, rx) = (self.get_history(), self.get_receiver());

        let hist = futures::stream::iter(history);
        let live = BroadcastStream::new(rx).filter_map(|res| async move { res.ok() });

        Box::pin(hist.chain(live))
    }
}
