//! Resolution of a start request into a full run specification.

use serde::{Deserialize, Serialize};

use crate::environment::{
    ConfigError, EnvironmentConfig, MaterializedEnv, materialize_environment,
};

/// Model identifier of the no-op agent that submits an empty result.
pub const INSTANT_EMPTY_SUBMIT: &str = "instant_empty_submit";

/// Container image the task runs in.
pub const DEFAULT_IMAGE: &str = "sweagent/swe-agent:latest";

/// Dataset split used for web-started runs.
pub const DEFAULT_SPLIT: &str = "dev";

/// Parameters of a start request, after transport-level parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub data_path: String,
    pub repo_path: String,
    pub model: String,
    pub environment: EnvironmentConfig,
    pub test_run: bool,
}

/// Model settings for one run.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub name: String,
    pub total_cost_limit: f64,
    pub per_instance_cost_limit: f64,
    pub temperature: f64,
    pub top_p: f64,
}

/// Environment settings for one run.
#[derive(Debug, Clone)]
pub struct EnvironmentSettings {
    pub image_name: String,
    pub data_path: String,
    pub split: String,
    pub verbose: bool,
    pub install_environment: bool,
    pub repo_path: String,
    pub setup: Option<MaterializedEnv>,
}

/// Post-run action settings.
#[derive(Debug, Clone)]
pub struct ActionSettings {
    pub open_pr: bool,
    pub skip_if_commits_reference_issue: bool,
}

/// A fully resolved run specification.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub suffix: String,
    pub environment: EnvironmentSettings,
    pub skip_existing: bool,
    pub model: ModelSettings,
    pub actions: ActionSettings,
}

/// Resolve a request against the web defaults, materializing the
/// environment config in the process.
///
/// A test run forces the model to [`INSTANT_EMPTY_SUBMIT`] regardless of
/// what was requested.
///
/// # Errors
/// Returns an error if environment materialization fails.
pub fn resolve_run_spec(request: &RunRequest) -> Result<RunSpec, ConfigError> {
    let setup = materialize_environment(&request.environment)?;

    let model_name = if request.test_run {
        INSTANT_EMPTY_SUBMIT.to_string()
    } else {
        request.model.clone()
    };

    Ok(RunSpec {
        suffix: String::new(),
        environment: EnvironmentSettings {
            image_name: DEFAULT_IMAGE.to_string(),
            data_path: request.data_path.clone(),
            split: DEFAULT_SPLIT.to_string(),
            verbose: true,
            install_environment: true,
            repo_path: request.repo_path.clone(),
            setup,
        },
        skip_existing: false,
        model: ModelSettings {
            name: model_name,
            total_cost_limit: 0.0,
            per_instance_cost_limit: 3.0,
            temperature: 0.0,
            top_p: 0.95,
        },
        actions: ActionSettings {
            open_pr: false,
            skip_if_commits_reference_issue: true,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::ConfigType;

    fn request(test_run: bool) -> RunRequest {
        RunRequest {
            data_path: "https://github.com/org/repo/issues/1".to_string(),
            repo_path: "https://github.com/org/repo".to_string(),
            model: "gpt4".to_string(),
            environment: EnvironmentConfig {
                config_type: ConfigType::ScriptPath,
                install_command_active: false,
                install: String::new(),
                script_path: String::new(),
            },
            test_run,
        }
    }

    #[test]
    fn test_test_run_forces_stub_model() {
        let spec = resolve_run_spec(&request(true)).unwrap();
        assert_eq!(spec.model.name, INSTANT_EMPTY_SUBMIT);
    }

    #[test]
    fn test_requested_model_is_kept_otherwise() {
        let spec = resolve_run_spec(&request(false)).unwrap();
        assert_eq!(spec.model.name, "gpt4");
    }

    #[test]
    fn test_defaults_applied() {
        let spec = resolve_run_spec(&request(false)).unwrap();
        assert_eq!(spec.environment.image_name, DEFAULT_IMAGE);
        assert_eq!(spec.environment.split, DEFAULT_SPLIT);
        assert!(spec.environment.install_environment);
        assert!(!spec.actions.open_pr);
        assert!(spec.environment.setup.is_none());
    }
}
