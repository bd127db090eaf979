//! Control routes: start and stop a session's run.

use std::{net::SocketAddr, sync::Arc};

use agent_run_config::{ConfigError, EnvironmentConfig, RunRequest, resolve_run_spec};
use agent_run_session::{RegistryError, SessionRegistry};
use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;

use crate::{
    factory::TaskFactory,
    identity::ensure_session_id,
    websocket::ws_handler,
};

/// Literal body of an accepted start request.
pub const START_BODY: &str = "Commands are being executed";

/// Literal body of an accepted stop request.
pub const STOP_BODY: &str = "Stopping computation";

/// Shared state for the control routes.
#[derive(Clone)]
pub struct AppState {
    /// Session-to-run registry.
    pub registry: Arc<SessionRegistry>,
    /// Factory for the opaque agent task.
    pub factory: Arc<dyn TaskFactory>,
}

/// Request error surfaced to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid environment parameter: {0}")]
    InvalidEnvironment(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::InvalidEnvironment(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self, "request failed");
        (status, self.to_string()).into_response()
    }
}

/// Query parameters of a start request. `environment` is a JSON-encoded
/// object; `test_run` is the literal `"true"` or `"false"`.
#[derive(Debug, Deserialize)]
pub struct RunParams {
    pub data_path: String,
    pub repo_path: String,
    pub model: String,
    pub environment: String,
    pub test_run: String,
}

/// Build the control router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/run", get(start_run))
        .route("/stop", get(stop_run))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn start_run(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RunParams>,
) -> Result<Response, ApiError> {
    let identity = ensure_session_id(&headers);

    let environment: EnvironmentConfig = serde_json::from_str(&params.environment)?;
    let request = RunRequest {
        data_path: params.data_path,
        repo_path: params.repo_path,
        model: params.model,
        environment,
        test_run: params.test_run.eq_ignore_ascii_case("true"),
    };

    let spec = resolve_run_spec(&request)?;
    let task = state.factory.create(&spec);
    state.registry.start_run(identity.id, task).await?;

    tracing::info!(session_id = %identity.id, model = %spec.model.name, "run accepted");
    Ok(accepted(START_BODY, &identity))
}

async fn stop_run(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let identity = ensure_session_id(&headers);
    let stopped = state.registry.stop_run(identity.id).await?;
    tracing::info!(session_id = %identity.id, stopped, "stop handled");
    Ok(accepted(STOP_BODY, &identity))
}

fn accepted(body: &'static str, identity: &crate::identity::SessionIdentity) -> Response {
    let mut response = (StatusCode::ACCEPTED, body).into_response();
    if let Some(cookie) = identity.set_cookie() {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

/// Server bootstrap error.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(
        "failed to bind {addr}: {source}. Is another server already listening \
         on this port? Stop it or choose a different address."
    )]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bind and serve the control surface.
///
/// Fails fast with an explicit remediation message if the address cannot
/// be bound; it never degrades silently.
///
/// # Errors
/// Returns an error if binding or serving fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), ServeError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_run_session::CancelPolicy;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::factory::InstantSubmitFactory;

    const ENVIRONMENT_PARAM: &str = "%7B%22config_type%22%3A%22script_path%22%2C%22install_command_active%22%3Afalse%2C%22install%22%3A%22%22%2C%22script_path%22%3A%22%22%7D";

    fn test_state() -> AppState {
        AppState {
            registry: Arc::new(SessionRegistry::new(CancelPolicy {
                poll_interval: Duration::from_millis(5),
                deadline: None,
            })),
            factory: Arc::new(InstantSubmitFactory),
        }
    }

    fn run_uri() -> String {
        format!(
            "/run?data_path=task.json&repo_path=repo&model=gpt4&test_run=true&environment={ENVIRONMENT_PARAM}"
        )
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_start_run_accepts_and_sets_cookie() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::builder().uri(run_uri()).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("cookie minted")
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("session_id="));
        assert_eq!(body_string(response).await, START_BODY);
    }

    #[tokio::test]
    async fn test_stop_without_run_still_accepts() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/stop").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_string(response).await, STOP_BODY);
    }

    #[tokio::test]
    async fn test_start_then_stop_round_trip() {
        let state = test_state();
        let session = Uuid::new_v4();
        let cookie = format!("session_id={}", session.simple());

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri(run_uri())
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        // The cookie was honored, not replaced.
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/stop")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_string(response).await, STOP_BODY);

        let handle = state.registry.run_handle(session).await.expect("run registered");
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_invalid_environment_is_bad_request() {
        let app = router(test_state());
        let uri = "/run?data_path=x&repo_path=y&model=m&test_run=false&environment=notjson";
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
