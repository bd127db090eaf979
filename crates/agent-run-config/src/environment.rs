//! Environment configuration and its materialization to disk.

use std::{io::Write, path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

/// How the environment setup is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigType {
    /// Inline configuration, materialized to a YAML file for the run.
    Manual,
    /// A path to an existing setup script, passed through unchanged.
    ScriptPath,
}

/// Environment setup parameters as sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub config_type: ConfigType,
    #[serde(default)]
    pub install_command_active: bool,
    #[serde(default)]
    pub install: String,
    #[serde(default)]
    pub script_path: String,
}

/// Materialization error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to write environment file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize environment config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A path usable by the task, plus the guard keeping it alive.
///
/// For inline configs the guard owns a temp file deleted when the last
/// clone is dropped. Cleanup is best-effort only: the file leaks under
/// abnormal process termination, matching the intended semantics of
/// "cleanup at process exit".
#[derive(Debug, Clone)]
pub struct MaterializedEnv {
    path: PathBuf,
    _guard: Option<Arc<NamedTempFile>>,
}

impl MaterializedEnv {
    /// The path handed to the task.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

/// Materialize an environment config into a path reference.
///
/// Inline (`manual`) configs are serialized to a fresh YAML temp file; an
/// inactive install command is forced to empty first. Script-path configs
/// pass through unchanged; an empty script path means no setup at all.
///
/// # Errors
/// Returns an error if the temp file cannot be created or written.
pub fn materialize_environment(
    config: &EnvironmentConfig,
) -> Result<Option<MaterializedEnv>, ConfigError> {
    match config.config_type {
        ConfigType::Manual => {
            let mut config = config.clone();
            if !config.install_command_active {
                config.install = String::new();
            }
            let mut file = tempfile::Builder::new().suffix(".yml").tempfile()?;
            file.write_all(serde_yaml::to_string(&config)?.as_bytes())?;
            file.flush()?;
            let path = file.path().to_path_buf();
            tracing::debug!(path = %path.display(), "materialized environment config");
            Ok(Some(MaterializedEnv {
                path,
                _guard: Some(Arc::new(file)),
            }))
        }
        ConfigType::ScriptPath => {
            if config.script_path.trim().is_empty() {
                return Ok(None);
            }
            Ok(Some(MaterializedEnv {
                path: PathBuf::from(&config.script_path),
                _guard: None,
            }))
        }
    }
}
