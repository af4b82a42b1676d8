//! HTTP surface: run endpoint and health check.
//!
//! | Method | Path             | Body / response                               |
//! |--------|------------------|-----------------------------------------------|
//! | GET    | `/health`        | service identity, status, timestamp           |
//! | POST   | `/v1/orchestrate`| `RunRequest` → `RunResponse` / `FailurePayload` |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::OrchestratorConfig;
use crate::pipeline::{FailurePayload, OrchestrationError, Orchestrator, RunRequest, RunResponse};
use crate::providers::Credentials;

pub const SERVICE_NAME: &str = "goal-swarm";

/// Builds an orchestrator for one request's credentials.
pub type OrchestratorFactory =
    Arc<dyn Fn(&Credentials) -> Result<Orchestrator, OrchestrationError> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    factory: OrchestratorFactory,
}

impl AppState {
    /// Real providers over a shared HTTP client.
    pub fn new(config: OrchestratorConfig, http: reqwest::Client) -> Self {
        Self::with_factory(Arc::new(move |credentials: &Credentials| {
            Orchestrator::from_credentials(config.clone(), credentials, &http)
        }))
    }

    pub fn with_factory(factory: OrchestratorFactory) -> Self {
        Self { factory }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/orchestrate", post(orchestrate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("server stopped");
    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn orchestrate(
    State(state): State<AppState>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<RunResponse>, OrchestrationError> {
    let Json(request) =
        payload.map_err(|rejection| OrchestrationError::InvalidRequest(rejection.body_text()))?;
    let orchestrator = (state.factory)(&request.credentials)?;
    let response = orchestrator.run(&request).await?;
    Ok(Json(response))
}

impl IntoResponse for OrchestrationError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            warn!(error = %self, "rejected request");
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self, scope = %self.scope(), "run failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(FailurePayload::new(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_router() -> Router {
        router(AppState::new(
            OrchestratorConfig::default(),
            reqwest::Client::new(),
        ))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/orchestrate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_identity() {
        let response = test_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["service"], SERVICE_NAME);
        assert_eq!(json["status"], "healthy");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn missing_credentials_is_bad_request() {
        let response = test_router()
            .oneshot(post_json(r#"{"goal":"Plan a launch","credentials":{}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "processing failed");
        assert_eq!(json["fallback"], true);
    }

    #[tokio::test]
    async fn malformed_body_uses_failure_payload() {
        let response = test_router().oneshot(post_json("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "processing failed");
        assert!(json["message"].as_str().unwrap().starts_with("invalid request"));
    }

    #[tokio::test]
    async fn internal_errors_map_to_500() {
        let state = AppState::with_factory(Arc::new(
            |_: &Credentials| -> Result<Orchestrator, OrchestrationError> {
                Err(OrchestrationError::Internal(anyhow::anyhow!("boom")))
            },
        ));
        let response = router(state)
            .oneshot(post_json(r#"{"goal":"g","credentials":{"groq":"k"}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "boom");
    }
}
