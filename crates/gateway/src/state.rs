use std::sync::Arc;

use iw_domain::config::Config;
use iw_geo::GeoResolver;

use crate::runtime::{PeriodicReview, TransformService};

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    /// Article transforms and chat over the completion and relay engines.
    pub transforms: Arc<TransformService>,
    /// Todo summaries, suggestions and saved AI records.
    pub periodic: Arc<PeriodicReview>,

    // ── Geo ───────────────────────────────────────────────────────────
    pub geo: Arc<GeoResolver>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// SHA-256 hash of the admin bearer token (read once at startup).
    /// `None` = dev mode (admin endpoints accessible without auth).
    pub admin_token_hash: Option<Vec<u8>>,
}
