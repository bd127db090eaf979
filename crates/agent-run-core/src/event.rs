//! Outward event types pushed to a session's observer channel.

use serde::{Deserialize, Serialize};

/// Severity of a mirrored log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Routine diagnostic output.
    Info,
    /// Something went wrong but the run continues.
    Warning,
    /// Failure detail that ends the run.
    Critical,
}

impl LogLevel {
    /// Wire/display name of the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Event delivered to a session's outward channel.
///
/// Delivery is push-based and best-effort: there is no acknowledgment,
/// no replay request, and no backpressure from the consumer to the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Incremental progress from the agent itself.
    AgentUpdate { text: String },
    /// A captured diagnostic line.
    LogUpdate { text: String, level: LogLevel },
    /// The run reached a terminal state.
    RunFinished,
    /// Execution environment setup/teardown status.
    EnvUpdate { text: String },
}

impl RunEvent {
    /// Approximate in-memory size, used for history eviction.
    #[must_use]
    pub fn approx_bytes(&self) -> usize {
        let text_len = match self {
            Self::AgentUpdate { text } | Self::EnvUpdate { text } => text.len(),
            Self::LogUpdate { text, .. } => text.len(),
            Self::RunFinished => 0,
        };
        text_len + std::mem::size_of::<Self>()
    }
}
