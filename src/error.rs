// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.
//!
//! The taxonomy mirrors what the client SDKs expect from the callable
//! endpoints: `invalid_argument`, `unauthenticated`, `store_unavailable`,
//! `conflict`, and `internal`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Firestore error: {0}")]
    Firestore(#[from] firestore::errors::FirestoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Check if this error is a freeze-consumption precondition conflict.
    ///
    /// The orchestrators treat these as benign: a retried invocation may find
    /// a freeze already marked used by the previous attempt.
    pub fn is_conflict(&self) -> bool {
        match self {
            AppError::Conflict(_) => true,
            AppError::Firestore(firestore::errors::FirestoreError::DatabaseError(ref e)) => {
                matches!(
                    e.public.code.as_str(),
                    "Aborted" | "AlreadyExists" | "FailedPrecondition"
                )
            }
            _ => false,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::InvalidArgument(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_argument", Some(msg.clone()))
            }
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated", None),
            AppError::StoreUnavailable(msg) => {
                tracing::error!(error = %msg, "Document store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", None)
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::Firestore(err) => {
                tracing::error!(error = ?err, "Firestore error");
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_variant_is_conflict() {
        let err = AppError::Conflict("freeze already used".to_string());
        assert!(err.is_conflict());
    }

    #[test]
    fn invalid_argument_is_not_conflict() {
        let err = AppError::InvalidArgument("missing userId".to_string());
        assert!(!err.is_conflict());
    }

    #[tokio::test]
    async fn invalid_argument_maps_to_bad_request() {
        let response = AppError::InvalidArgument("missing userId".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unauthenticated_maps_to_401() {
        let response = AppError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
