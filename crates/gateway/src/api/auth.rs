//! Admin authentication middleware.
//!
//! The env var named by `config.server.admin_token_env` (default
//! `IW_ADMIN_TOKEN`) is read **once at startup** and its SHA-256 digest is
//! cached in `AppState`.
//! - If it is set and non-empty, every `/admin` request must carry
//!   `Authorization: Bearer <token>`.
//! - If it is unset or empty, the server logs a warning once and allows
//!   unauthenticated access (dev mode).

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use iw_domain::error::Error;

use super::error::ApiError;
use crate::state::AppState;

/// Attach via `axum::middleware::from_fn_with_state`.
pub async fn require_admin_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let expected_hash = match &state.admin_token_hash {
        Some(h) => h,
        None => return next.run(req).await,
    };

    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    // Compare fixed-length digests so the token length does not leak.
    let provided_hash = Sha256::digest(provided.as_bytes());

    if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
        tracing::debug!(path = %req.uri().path(), "admin token rejected");
        return ApiError(Error::Unauthorized("invalid or missing admin token".into()))
            .into_response();
    }

    next.run(req).await
}
