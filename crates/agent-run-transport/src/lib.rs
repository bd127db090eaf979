//! HTTP control surface and WebSocket event push for agent runs.
//!
//! Provides:
//! - `/run` and `/stop` control routes
//! - `/ws` per-session outward event channel
//! - Cookie-based session identity
//! - The `TaskFactory` seam to the agent subsystem

pub mod factory;
pub mod identity;
pub mod routes;
pub mod websocket;

pub use factory::{InstantSubmitFactory, TaskFactory};
pub use identity::{SESSION_COOKIE, SessionIdentity, ensure_session_id};
pub use routes::{AppState, START_BODY, STOP_BODY, ServeError, router, serve};
