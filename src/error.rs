//! Engine-level error kinds and their HTTP mapping.
//!
//! Kinds follow spec.md §7. `SandboxInfraError` and `RuleValidationFailure`
//! are intentionally absent here — per the spec they never surface as a
//! request failure, only as a `ValidationOutcome` recorded into a rule's
//! validation history.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    InputError(String),

    #[error("{0}")]
    ParseError(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    GenerationError(String),

    #[error("{0}")]
    StoreError(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl EngineError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            EngineError::InputError(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            EngineError::ParseError(_) => (StatusCode::BAD_REQUEST, "PARSE_ERROR"),
            EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "EMPLOYEE_NOT_FOUND"),
            EngineError::GenerationError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "GENERATION_FAILED"),
            EngineError::StoreError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
            EngineError::Unexpected(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = serde_json::json!({
            "status": "ERROR",
            "code": code,
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
