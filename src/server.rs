//! # HTTP Server Module
//!
//! axum transport for the research pipeline.
//!
//! - `POST /api/research` streams newline-delimited JSON events
//! - `POST /api/research/save` sanitizes and stores a research payload
//! - `GET /health` liveness check
//!
//! Once the research stream has started the response status is committed;
//! failures after that point arrive as the stream's `error` event.

use std::convert::Infallible;
use std::sync::Arc;

use axum::async_trait;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::artifact::{sanitize, ResearchQuery};
use crate::error::ResearchError;
use crate::orchestrator::Orchestrator;
use crate::store::ResearchStore;

/// Header carrying the caller identity supplied by the identity layer.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn ResearchStore>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, store: Arc<dyn ResearchStore>) -> Self {
        Self {
            orchestrator,
            store,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/research", post(stream_research))
        .route("/api/research/save", post(save_research))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// =============================================================================
// STREAMING RESEARCH
// =============================================================================
#[derive(Debug, Deserialize)]
struct ResearchRequest {
    query: String,
    #[serde(default)]
    mode: Option<Value>,
}

async fn stream_research(
    State(state): State<AppState>,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<Response, ResearchError> {
    let Json(request) = payload.map_err(|e| ResearchError::InvalidRequest(e.body_text()))?;
    let query = ResearchQuery::new(request.query, request.mode.as_ref().and_then(Value::as_str));
    info!(mode = query.mode.as_str(), "Opening research stream");

    let events = Arc::clone(&state.orchestrator).spawn(query);
    let body = Body::from_stream(
        events
            .into_stream()
            .map(|event| Ok::<_, Infallible>(event.to_ndjson())),
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

// =============================================================================
// SAVE RESEARCH
// =============================================================================
/// Caller identity taken from [`USER_ID_HEADER`].
pub struct CallerId(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = ResearchError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| CallerId(id.to_string()))
            .ok_or_else(|| ResearchError::Unauthorized("missing caller identity".into()))
    }
}

async fn save_research(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ResearchError> {
    let Json(payload) = payload.map_err(|e| ResearchError::InvalidPayload(e.body_text()))?;
    let saved = sanitize(&payload)?;
    debug!(user_id = %user_id, query = %saved.query, "Saving research");

    let stored = state
        .store
        .save(&user_id, &saved.query, saved.record)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "data": stored })),
    )
        .into_response())
}
