//! Core abstractions for agent run lifecycle orchestration.
//!
//! This crate provides the fundamental building blocks:
//! - `RunEvent` - Typed outward event enum
//! - `EventStore` - Broadcast + history for reconnection support
//! - `LogSink` - Line-oriented diagnostic capture, mirrored outward
//! - `LifecycleEvent` / `LifecycleObserver` - Run lifecycle notifications
//! - `AgentTask` / `StopSignal` - The task seam and its cooperative stop channel

pub mod bridge;
pub mod event;
pub mod lifecycle;
pub mod sink;
pub mod status;
pub mod store;
pub mod task;

/// Session identifier.
pub type SessionId = uuid::Uuid;

pub use bridge::EventBridge;
pub use event::{LogLevel, RunEvent};
pub use lifecycle::{LifecycleEvent, LifecycleObserver, RunOutcome};
pub use sink::LogSink;
pub use status::{RunStatus, StatusCell};
pub use store::EventStore;
pub use task::{AgentTask, InstantEmptySubmit, RunContext, StopSignal, TaskError};
