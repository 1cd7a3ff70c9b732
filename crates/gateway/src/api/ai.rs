//! Article AI endpoints and the streaming chat.

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use iw_domain::message::ChatMessage;

use super::error::{ok, ApiResult};
use super::sse::relay_sse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ── One-shot transforms ────────────────────────────────────────────

pub async fn summary(
    State(state): State<AppState>,
    Json(body): Json<ContentRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(ok(state.transforms.summarize(&body.content).await?))
}

pub async fn quick_read(
    State(state): State<AppState>,
    Json(body): Json<ContentRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(ok(state.transforms.quick_read(&body.content).await?))
}

pub async fn title(
    State(state): State<AppState>,
    Json(body): Json<ContentRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(ok(state.transforms.title(&body.content).await?))
}

pub async fn category(
    State(state): State<AppState>,
    Json(body): Json<CategoryRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(ok(state
        .transforms
        .category(&body.content, &body.categories)
        .await?))
}

pub async fn tags(
    State(state): State<AppState>,
    Json(body): Json<TagsRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(ok(state.transforms.tags(&body.content, &body.tags).await?))
}

// ── Streaming ──────────────────────────────────────────────────────

/// Validation failures are plain JSON errors; once the relay starts the
/// response is an event stream.
pub async fn optimize(
    State(state): State<AppState>,
    Json(body): Json<ContentRequest>,
) -> ApiResult<Response> {
    let handle = state.transforms.optimize(&body.content)?;
    Ok(relay_sse(handle).into_response())
}

pub async fn chat(
    State(state): State<AppState>,
    Json(history): Json<Vec<ChatMessage>>,
) -> ApiResult<Response> {
    tracing::debug!(turns = history.len(), "chat request");
    let handle = state.transforms.chat(history)?;
    Ok(relay_sse(handle).into_response())
}
