//! Line-oriented diagnostic capture, mirrored to the outward channel.

use std::sync::Arc;

use crate::{EventStore, LogLevel};

/// Append-only destination for a run's diagnostic text.
///
/// Every appended line is mirrored outward as a `log_update` event with a
/// severity level, in append order. Each run gets its own sink; output from
/// concurrent runs is never mixed into one sink.
#[derive(Clone)]
pub struct LogSink {
    store: Arc<EventStore>,
}

impl LogSink {
    /// Create a sink writing into the given store.
    #[must_use]
    pub fn new(store: Arc<EventStore>) -> Self {
        Self { store }
    }

    /// Append text at `info` level.
    pub fn append<S: AsRef<str>>(&self, text: S) {
        self.append_at(text, LogLevel::Info);
    }

    /// Append text at the given level, one event per line.
    pub fn append_at<S: AsRef<str>>(&self, text: S, level: LogLevel) {
        for line in text.as_ref().lines() {
            self.store.push_log(line, level);
        }
    }
}
