//! Error types for the Gateway

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use induction_core::InductionError;
use thiserror::Error;

/// Gateway error type
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Induction(#[from] InductionError),

    /// Request body could not be decoded
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}

impl GatewayError {
    /// HTTP status for this error.
    ///
    /// - Unknown, ended or completed session: 404
    /// - Anything the participant can fix: 400
    /// - Grader error: 502, grader timeout: 504
    /// - Configuration and log failures: 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Induction(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Induction(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Induction(InductionError::OracleFailure(_)) => StatusCode::BAD_GATEWAY,
            Self::Induction(InductionError::OracleTimeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-checkable reason code
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Induction(e) => e.reason_code(),
            Self::BadRequest(_) => "invalid_request",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "reason": self.reason_code(),
        }));
        (status, body).into_response()
    }
}

/// Result type for Gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
