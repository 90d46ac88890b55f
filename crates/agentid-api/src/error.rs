//! # API Error Types
//!
//! Every error response is a flat JSON object:
//!
//! ```json
//! {"error": "forbidden", "message": "policy check failed: action not allowed"}
//! ```
//!
//! An expired credential and one whose issuance date or TTL cannot be
//! evaluated both answer `expired_token`; the audit entry keeps the exact
//! reason. A bad signature and an untrusted issuer share one 401 body so a
//! caller cannot tell them apart. Internal error details are logged and
//! never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use agentid_authz::Denial;

/// Message returned with `expired_token`.
pub const EXPIRED_MESSAGE: &str = "The delegation token has expired.";

/// Message returned with `invalid_credential`.
pub const REJECTED_MESSAGE: &str = "credential rejected";

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Request body could not be parsed or is missing fields (400).
    #[error("{0}")]
    BadRequest(String),

    /// Operator authentication failed (401).
    #[error("{0}")]
    Unauthorized(String),

    /// The presented credential has expired or has no evaluable lifetime (401).
    #[error("The delegation token has expired.")]
    ExpiredToken,

    /// Signature or issuer rejected (401).
    #[error("credential rejected")]
    InvalidCredential,

    /// Role or policy refused the action (403).
    #[error("{0}")]
    Forbidden(String),

    /// Resource not available (404).
    #[error("{0}")]
    NotFound(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_payload"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::ExpiredToken => (StatusCode::UNAUTHORIZED, "expired_token"),
            Self::InvalidCredential => (StatusCode::UNAUTHORIZED, "invalid_credential"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::MalformedPayload(_) => Self::BadRequest("invalid payload".into()),
            Denial::Expired | Denial::MalformedTemporalData(_) => Self::ExpiredToken,
            Denial::InvalidSignature | Denial::UntrustedIssuer => Self::InvalidCredential,
            Denial::MissingRole | Denial::ActionNotRecognized | Denial::RoleNotPermitted => {
                Self::Forbidden(denial.to_string())
            }
        }
    }
}
