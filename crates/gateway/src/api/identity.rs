//! `Caller` extractor: the opaque user id the edge puts in a header.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use iw_domain::error::Error;
use iw_domain::record::UserId;

use super::error::ApiError;
use crate::state::AppState;

/// Handlers that touch per-user records take a `Caller`. The header name
/// comes from `server.identity_header`.
pub struct Caller(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = state.config.server.identity_header.as_str();
        parts
            .headers
            .get(header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Caller(UserId(v.to_string())))
            .ok_or_else(|| ApiError(Error::Unauthorized(format!("missing {header} header"))))
    }
}
