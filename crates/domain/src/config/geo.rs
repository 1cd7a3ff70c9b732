use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IP geolocation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    /// Primary lookup. The address is appended to this URL.
    #[serde(default = "d_primary_url")]
    pub primary_url: String,
    /// Fallback lookup. `{ip}` is replaced by the address.
    #[serde(default = "d_fallback_url")]
    pub fallback_url: String,
    #[serde(default = "d_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "d_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Cache bound. Once reached, new results are not cached.
    #[serde(default = "d_max_entries")]
    pub max_entries: usize,
    #[serde(default = "d_local_label")]
    pub local_label: String,
    #[serde(default = "d_unknown_label")]
    pub unknown_label: String,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            primary_url: d_primary_url(),
            fallback_url: d_fallback_url(),
            connect_timeout_ms: d_connect_timeout_ms(),
            read_timeout_ms: d_read_timeout_ms(),
            max_entries: d_max_entries(),
            local_label: d_local_label(),
            unknown_label: d_unknown_label(),
        }
    }
}

impl GeoConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

fn d_primary_url() -> String {
    "https://api.bilibili.com/x/web-interface/zone?ip=".into()
}
fn d_fallback_url() -> String {
    "http://whois.pconline.com.cn/ipJson.jsp?ip={ip}&json=true".into()
}
fn d_connect_timeout_ms() -> u64 {
    3000
}
fn d_read_timeout_ms() -> u64 {
    5000
}
fn d_max_entries() -> usize {
    4096
}
fn d_local_label() -> String {
    "本机地址".into()
}
fn d_unknown_label() -> String {
    "未知".into()
}
