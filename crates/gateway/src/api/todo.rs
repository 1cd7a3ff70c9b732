//! Todo assistant: periodic summaries, suggestions, saved AI records.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use iw_domain::message::ChatMessage;

use super::error::{ok, ApiResult};
use super::identity::Caller;
use super::sse::relay_sse;
use crate::runtime::PeriodKind;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    #[serde(rename = "type", default = "d_period")]
    pub period: String,
}

fn d_period() -> String {
    PeriodKind::Daily.as_str().into()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecordRequest {
    #[serde(default)]
    pub record_type: String,
    #[serde(default)]
    pub content: String,
}

/// Answers with the report text; the full record stays readable through
/// `get_record`.
pub async fn summary(
    State(state): State<AppState>,
    Caller(user): Caller,
    Json(body): Json<SummaryRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let period = PeriodKind::parse(&body.period)?;
    let record = state.periodic.summarize(&user, period).await?;
    Ok(ok(record.content))
}

pub async fn suggest(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> ApiResult<Json<serde_json::Value>> {
    let record = state.periodic.suggest(&user).await?;
    Ok(ok(record.content))
}

/// Same relay and prompt as the public chat, behind admin auth.
pub async fn chat(
    State(state): State<AppState>,
    Json(history): Json<Vec<ChatMessage>>,
) -> ApiResult<Response> {
    let handle = state.transforms.chat(history)?;
    Ok(relay_sse(handle).into_response())
}

/// `{"data": null}` when nothing has been saved yet.
pub async fn get_record(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(record_type): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(ok(state.periodic.record(&user, &record_type).await?))
}

pub async fn save_record(
    State(state): State<AppState>,
    Caller(user): Caller,
    Json(body): Json<SaveRecordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(ok(state
        .periodic
        .save_record(&user, &body.record_type, &body.content)
        .await?))
}
