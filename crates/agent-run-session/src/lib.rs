//! Run lifecycle orchestration.
//!
//! Provides:
//! - `RunHandle` - owns one task execution and its forced-stop operation
//! - `ForcefulCanceller` / `CancelPolicy` - repeated stop-signal delivery
//! - `SessionRegistry` - at most one live run per session

pub mod cancel;
pub mod handle;
pub mod registry;

pub use cancel::{CancelError, CancelPolicy, ForcefulCanceller};
pub use handle::RunHandle;
pub use registry::{RegistryError, SessionRegistry};
