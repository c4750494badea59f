// SPDX-License-Identifier: MIT

//! Shared-token check for the callable endpoints.
//!
//! Identity and per-user authorization live in the clients and security
//! rules; the server only gates on a deployment-wide bearer token. With no
//! token configured the check is disabled (emulator / local development).

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Middleware that requires the configured bearer token.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = &state.config.api_token {
        let provided = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        if provided != Some(expected.as_str()) {
            return Err(AppError::Unauthenticated);
        }
    }

    Ok(next.run(request).await)
}
