//! Run configuration resolution and environment materialization.
//!
//! Provides:
//! - `EnvironmentConfig` - inline environment setup or script path reference
//! - `materialize_environment` - inline map → scoped YAML temp file
//! - `RunRequest` / `RunSpec` - request parameters resolved against defaults

pub mod environment;
pub mod run_spec;

pub use environment::{ConfigError, ConfigType, EnvironmentConfig, MaterializedEnv};
pub use run_spec::{INSTANT_EMPTY_SUBMIT, RunRequest, RunSpec, resolve_run_spec};
