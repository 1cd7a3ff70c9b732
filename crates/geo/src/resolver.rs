use std::net::IpAddr;
use std::sync::Arc;

use iw_domain::config::GeoConfig;
use iw_domain::error::Result;

use crate::cache::BoundedCache;
use crate::compose::is_local_ip;
use crate::provider::{build_client, BilibiliLookup, GeoLookup, PcOnlineLookup};

/// Resolves IP addresses to location strings.
///
/// Never fails: every error path degrades to the unknown label, which
/// is never cached, so the next request for that address tries again.
pub struct GeoResolver {
    chain: Vec<Arc<dyn GeoLookup>>,
    cache: BoundedCache,
    local_label: String,
    unknown_label: String,
}

impl GeoResolver {
    pub fn new(
        chain: Vec<Arc<dyn GeoLookup>>,
        max_entries: usize,
        local_label: impl Into<String>,
        unknown_label: impl Into<String>,
    ) -> Self {
        Self {
            chain,
            cache: BoundedCache::new(max_entries),
            local_label: local_label.into(),
            unknown_label: unknown_label.into(),
        }
    }

    /// Primary then fallback, both over one short-timeout client.
    pub fn from_config(cfg: &GeoConfig) -> Result<Self> {
        let client = build_client(cfg)?;
        let chain: Vec<Arc<dyn GeoLookup>> = vec![
            Arc::new(BilibiliLookup::new(client.clone(), &cfg.primary_url)),
            Arc::new(PcOnlineLookup::new(client, &cfg.fallback_url)),
        ];
        Ok(Self::new(
            chain,
            cfg.max_entries,
            &cfg.local_label,
            &cfg.unknown_label,
        ))
    }

    pub async fn resolve(&self, ip: &str) -> String {
        let ip = ip.trim();
        if ip.is_empty() || ip.eq_ignore_ascii_case("unknown") || ip.parse::<IpAddr>().is_err() {
            return self.unknown_label.clone();
        }
        if is_local_ip(ip) {
            return self.local_label.clone();
        }
        if let Some(hit) = self.cache.get(ip) {
            return hit;
        }

        for provider in &self.chain {
            match provider.lookup(ip).await {
                Ok(Some(source)) => {
                    if !self.cache.insert_if_room(ip, &source) {
                        tracing::debug!(ip, bound = self.cache.capacity(), "geo cache full, result not cached");
                    }
                    return source;
                }
                Ok(None) => {
                    tracing::debug!(provider = provider.name(), ip, "geo lookup returned nothing");
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), ip, error = %e, "geo lookup failed");
                }
            }
        }

        self.unknown_label.clone()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("geo cache cleared");
    }
}
