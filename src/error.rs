//! # Error Module
//!
//! One error type for the whole research pipeline. Each variant maps onto a
//! place in the request lifecycle:
//!
//! - before streaming starts (`InvalidRequest`) the caller gets an HTTP status
//! - inside a strategy (`Upstream`, `EmptyQuery`) the error becomes the
//!   terminal `error` event of an already-open stream
//! - on the save path (`InvalidPayload`, `Unauthorized`, `Persistence`) the
//!   caller gets an HTTP status with an error envelope

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors produced by the research pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResearchError {
    /// Malformed or missing input before any streaming begins.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The query was empty or whitespace only.
    #[error("research query must not be empty")]
    EmptyQuery,

    /// An external search or generation service failed.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// A save payload is missing `query` or `research`.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// No caller identity was supplied.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The storage collaborator reported a failure; its message is passed through.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ResearchError {
    /// HTTP status used when this error is returned outside a stream.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResearchError::InvalidRequest(_)
            | ResearchError::EmptyQuery
            | ResearchError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ResearchError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ResearchError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ResearchError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ResearchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(json!({
                "success": false,
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ResearchError::InvalidRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ResearchError::InvalidPayload("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ResearchError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ResearchError::Persistence("disk full".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_persistence_message_passes_through() {
        let err = ResearchError::Persistence("table locked".into());
        assert!(err.to_string().contains("table locked"));
    }
}
