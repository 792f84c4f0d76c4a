//! HTTP routes.
//!
//! - `POST /analyze`        : run one orchestrator turn for a session
//! - `GET  /health`         : liveness and version
//! - `GET  /sessions`       : sessions with their turn counts
//! - `GET  /policy`         : the example set the policy is using
//! - `POST /policy/reload`  : re-read the example set from disk

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use sentinel_agent::{AbortSignal, SessionInfo};
use sentinel_policy::{ExampleSetSummary, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::AppServices;

pub type SharedServices = Arc<AppServices>;

/// Build the router with all routes, a trace layer and the body limit.
pub fn build_router(services: SharedServices) -> Router {
    let body_limit = services.config.gateway.body_limit_bytes;
    Router::new()
        .route("/analyze", post(analyze_handler))
        .route("/health", get(health_handler))
        .route("/sessions", get(list_sessions_handler))
        .route("/policy", get(policy_handler))
        .route("/policy/reload", post(reload_policy_handler))
        .with_state(services)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub status: String,
    pub session_id: String,
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub detail: String,
}

impl ErrorResponse {
    fn new(detail: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            detail: detail.into(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub count: usize,
    pub sessions: Vec<SessionInfo>,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn analyze_handler(
    State(services): State<SharedServices>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let gateway = &services.config.gateway;
    let user_id = payload
        .user_id
        .unwrap_or_else(|| gateway.default_user_id.clone());
    let session_id = payload
        .session_id
        .unwrap_or_else(|| gateway.default_session_id.clone());

    let query = payload.query;
    info!(%user_id, %session_id, query_len = query.len(), "analyze request");

    // The turn runs in its own task so a dropped connection cannot leave
    // the session half-updated.
    let turn = {
        let services = services.clone();
        let user_id = user_id.clone();
        let session_id = session_id.clone();
        tokio::spawn(async move {
            services
                .orchestrator
                .handle(
                    &services.sessions,
                    &user_id,
                    &session_id,
                    &query,
                    &AbortSignal::never(),
                )
                .await
        })
    };

    match turn.await {
        Ok(Ok(report)) => Ok(Json(AnalyzeResponse {
            status: "success".into(),
            session_id,
            response: report.response(),
        })),
        Ok(Err(e)) => {
            error!(%user_id, %session_id, error = %e, "analyze failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            ))
        }
        Err(e) => {
            error!(%user_id, %session_id, error = %e, "analyze task failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Turn did not complete")),
            ))
        }
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

async fn list_sessions_handler(State(services): State<SharedServices>) -> Json<SessionListResponse> {
    let sessions = services.sessions.list();
    Json(SessionListResponse {
        count: sessions.len(),
        sessions,
    })
}

async fn policy_handler(State(services): State<SharedServices>) -> Json<ExampleSetSummary> {
    Json(services.store.summary())
}

async fn reload_policy_handler(
    State(services): State<SharedServices>,
) -> Result<Json<ExampleSetSummary>, ApiError> {
    match services.store.reload() {
        Ok(set) => {
            services.policy.announce_example_set(set.len());
            Ok(Json(services.store.summary()))
        }
        Err(e) => {
            warn!(error = %e, "Policy reload failed, keeping current example set");
            let status = match e {
                StoreError::NoBackingFile => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((status, Json(ErrorResponse::new(e.to_string()))))
        }
    }
}
