//! Bridge from lifecycle notifications to the outward event stream.

use std::sync::Arc;

use crate::{
    EventStore, LifecycleEvent, LifecycleObserver, LogLevel, LogSink, RunOutcome,
};

/// Translates lifecycle notifications into outward events plus log lines.
///
/// Every notification becomes a `RunEvent` on the originating session's
/// channel and a corresponding line in the log sink. The bridge holds no
/// state beyond the store reference, so per-run ordering is exactly the
/// emission order of the notifications.
pub struct EventBridge {
    store: Arc<EventStore>,
    sink: LogSink,
}

impl EventBridge {
    /// Create a bridge pushing into the given store.
    #[must_use]
    pub fn new(store: Arc<EventStore>) -> Self {
        let sink = LogSink::new(Arc::clone(&store));
        Self { store, sink }
    }
}

impl LifecycleObserver for EventBridge {
    fn on_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::RunStarted => {
                self.store.push_agent("Starting the run");
                self.sink.append("Starting the run");
            }
            LifecycleEvent::AgentStep { message } => {
                self.store.push_agent(message.clone());
                self.sink.append(message);
            }
            LifecycleEvent::EnvUpdate { message } => {
                self.store.push_env(message.clone());
                self.sink.append(message);
            }
            LifecycleEvent::RunFinished { outcome } => match outcome {
                RunOutcome::Completed => {
                    self.store.push_finished();
                    self.sink.append("Run finished");
                }
                RunOutcome::Stopped => {
                    self.store.push_finished();
                    self.store.push_agent("Run stopped by user");
                    self.sink.append("Run stopped by user");
                }
                RunOutcome::Errored { message, detail } => {
                    self.store
                        .push_agent(format!("Error (see log for details): {message}"));
                    self.sink.append_at(detail, LogLevel::Critical);
                    self.sink.append_at(message, LogLevel::Critical);
                    self.store.push_finished();
                }
            },
        }
    }
}
