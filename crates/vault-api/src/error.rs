//! # API Error Types
//!
//! Maps [`AnchorError`] kinds to HTTP status codes and structured JSON
//! error bodies:
//!
//! | Kind | HTTP |
//! |---|---|
//! | `InvalidSchemaVersion` / `InvalidPayloadHash` / `MissingRequiredField` / `InvalidTimestamp` | 400 |
//! | `DuplicateAnchor` | 409 |
//! | `CanonicalizationFailed` | 422 |
//! | `KeyUnavailable` | 500 |
//! | storage / timeout | 503 |
//!
//! Infrastructure error details are logged server-side and never exposed
//! in response bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vault_anchor::AnchorError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The error payload.
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error kind (e.g. `DUPLICATE_ANCHOR`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Application-level error implementing [`IntoResponse`].
#[derive(Error, Debug)]
#[error("{0}")]
pub struct AppError(pub AnchorError);

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            AnchorError::InvalidSchemaVersion(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_SCHEMA_VERSION")
            }
            AnchorError::InvalidPayloadHash(_) => (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD_HASH"),
            AnchorError::MissingRequiredField(_) => {
                (StatusCode::BAD_REQUEST, "MISSING_REQUIRED_FIELD")
            }
            AnchorError::InvalidTimestamp(_) => (StatusCode::BAD_REQUEST, "INVALID_TIMESTAMP"),
            AnchorError::DuplicateAnchor(_) => (StatusCode::CONFLICT, "DUPLICATE_ANCHOR"),
            AnchorError::CanonicalizationFailed(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "CANONICALIZATION_FAILED")
            }
            AnchorError::KeyUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "KEY_UNAVAILABLE")
            }
            AnchorError::Timeout | AnchorError::Ledger(_) | AnchorError::Crypto(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_ERROR")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Infrastructure details stay in the logs.
        let message = match &self.0 {
            AnchorError::Ledger(_) | AnchorError::Crypto(_) => {
                tracing::error!(error = %self.0, "storage backend error");
                "The vault storage backend is unavailable".to_string()
            }
            AnchorError::KeyUnavailable(_) => {
                tracing::error!(error = %self.0, "vault key unavailable");
                "The vault signing key is unavailable".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<AnchorError> for AppError {
    fn from(err: AnchorError) -> Self {
        Self(err)
    }
}
