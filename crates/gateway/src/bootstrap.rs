//! AppState construction shared by `serve` and the one-shot CLI commands.

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use iw_domain::config::{Config, ConfigSeverity};
use iw_domain::record::{AiRecordStore, DiaryStore, TodoStore};
use iw_geo::GeoResolver;
use iw_providers::{CallClient, CompletionEngine, HttpTransport, ProviderSettings, RelayEngine};

use crate::runtime::{PeriodicReview, TransformService};
use crate::state::AppState;
use crate::store::InMemoryStore;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Outbound AI client ───────────────────────────────────────────
    let transport: Arc<dyn HttpTransport> = Arc::new(
        CallClient::new(config.ai.connect_timeout()).context("building AI HTTP client")?,
    );
    tracing::info!(
        api_url = %config.ai.api_url,
        model = %config.ai.model,
        connect_timeout_secs = config.ai.connect_timeout_secs,
        "AI call client ready"
    );

    // ── Geo resolver ─────────────────────────────────────────────────
    let geo = Arc::new(GeoResolver::from_config(&config.geo).context("building geo resolver")?);
    tracing::info!(max_entries = config.geo.max_entries, "geo resolver ready");

    // ── Storage ──────────────────────────────────────────────────────
    let store = Arc::new(InMemoryStore::new());
    tracing::info!("in-memory record store ready");

    Ok(assemble(config, transport, store, geo))
}

/// Wire the services over already-built collaborators.
pub fn assemble<S>(
    config: Arc<Config>,
    transport: Arc<dyn HttpTransport>,
    store: Arc<S>,
    geo: Arc<GeoResolver>,
) -> AppState
where
    S: TodoStore + DiaryStore + AiRecordStore + 'static,
{
    let settings = ProviderSettings::from_config(&config.ai);
    if settings.api_key.is_none() {
        tracing::warn!(
            env = %config.ai.api_key_env,
            "no AI API key configured, provider calls will be rejected"
        );
    }

    let completion = Arc::new(CompletionEngine::new(transport.clone(), settings.clone()));
    let relay = Arc::new(RelayEngine::new(transport, settings, config.ai.relay_buffer));
    let transforms = Arc::new(TransformService::new(completion, relay, &config.ai));

    let todos: Arc<dyn TodoStore> = store.clone();
    let diaries: Arc<dyn DiaryStore> = store.clone();
    let records: Arc<dyn AiRecordStore> = store;
    let periodic = Arc::new(PeriodicReview::new(transforms.clone(), todos, diaries, records));

    let admin_token_hash = admin_token_hash(&config);

    AppState {
        config,
        transforms,
        periodic,
        geo,
        admin_token_hash,
    }
}

/// Read the admin token once and hash it for constant-time comparison.
fn admin_token_hash(config: &Config) -> Option<Vec<u8>> {
    let env_var = &config.server.admin_token_env;
    match std::env::var(env_var).ok().filter(|t| !t.is_empty()) {
        Some(t) => {
            tracing::info!(source = %format!("env:{env_var}"), "admin bearer-token auth enabled");
            Some(Sha256::digest(t.as_bytes()).to_vec())
        }
        None => {
            tracing::warn!("admin bearer-token auth DISABLED, set the {env_var} env var");
            None
        }
    }
}
