pub mod ai;
pub mod auth;
pub mod error;
pub mod geo;
pub mod identity;
pub mod sse;
pub mod todo;

use axum::middleware;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required) and **admin**
/// (gated behind the admin bearer-token middleware).
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health))
        // Reader-facing AI
        .route("/ai/chat", post(ai::chat))
        .route("/ai/quick-read", post(ai::quick_read))
        // IP location
        .route("/api/ip/source", get(geo::caller_source))
        .route("/api/ip/source/:ip", get(geo::ip_source));

    let admin = Router::new()
        // Article AI
        .route("/admin/ai/summary", post(ai::summary))
        .route("/admin/ai/title", post(ai::title))
        .route("/admin/ai/category", post(ai::category))
        .route("/admin/ai/tags", post(ai::tags))
        .route("/admin/ai/optimize", post(ai::optimize))
        // Todo assistant
        .route("/admin/todo/ai/summary", post(todo::summary))
        .route("/admin/todo/ai/suggest", post(todo::suggest))
        .route("/admin/todo/ai/chat", post(todo::chat))
        .route("/admin/todo/ai/record", post(todo::save_record))
        .route("/admin/todo/ai/record/:record_type", get(todo::get_record))
        // Geo cache
        .route(
            "/admin/ip/cache",
            get(geo::cache_stats).delete(geo::clear_cache),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_admin_token,
        ));

    public.merge(admin)
}

/// Router with state applied, ready to serve or to drive in tests.
pub fn app(state: AppState) -> Router {
    router(state.clone()).with_state(state)
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
