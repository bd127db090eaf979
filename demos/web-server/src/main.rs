//! Demo control server with a simulated agent behind it.
//!
//! Run with: cargo run -p web-server-demo
//!
//! Start a run:
//!   curl 'http://localhost:8000/run?data_path=task.json&repo_path=repo&model=demo&test_run=false&environment=%7B%22config_type%22%3A%22script_path%22%2C%22install_command_active%22%3Afalse%2C%22install%22%3A%22%22%2C%22script_path%22%3A%22%22%7D'
//! then watch events on ws://localhost:8000/ws and stop it via /stop.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use agent_run_config::{INSTANT_EMPTY_SUBMIT, RunSpec};
use agent_run_core::{AgentTask, InstantEmptySubmit, RunContext, TaskError};
use agent_run_session::{CancelPolicy, SessionRegistry};
use agent_run_transport::{AppState, TaskFactory, serve};
use async_trait::async_trait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Simulated agent: a few environment updates, then steps until done or
/// stopped. Stands in for the real agent subsystem.
struct SimulatedAgent {
    steps: usize,
}

#[async_trait]
impl AgentTask for SimulatedAgent {
    async fn run(&self, ctx: &RunContext) -> Result<(), TaskError> {
        ctx.env_update("Setting up environment");
        ctx.sink.append("pulling image sweagent/swe-agent:latest");
        ctx.stop.checkpoint()?;
        ctx.env_update("Environment ready");

        for step in 1..=self.steps {
            tokio::select! {
                () = ctx.stop.cancelled() => return Err(TaskError::Interrupted),
                () = tokio::time::sleep(Duration::from_millis(500)) => {}
            }
            ctx.agent_step(format!("Completed step {step}/{}", self.steps));
        }

        ctx.env_update("Tearing down environment");
        ctx.agent_step("Submitting result");
        Ok(())
    }
}

struct DemoFactory;

impl TaskFactory for DemoFactory {
    fn create(&self, spec: &RunSpec) -> Arc<dyn AgentTask> {
        if spec.model.name == INSTANT_EMPTY_SUBMIT {
            Arc::new(InstantEmptySubmit)
        } else {
            Arc::new(SimulatedAgent { steps: 20 })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let state = AppState {
        registry: Arc::new(SessionRegistry::new(CancelPolicy::default())),
        factory: Arc::new(DemoFactory),
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], 8000));
    tracing::info!("starting demo control server");
    serve(addr, state).await?;
    Ok(())
}
