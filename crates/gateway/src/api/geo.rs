use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::response::Json;

use super::error::ok;
use crate::state::AppState;

/// Client address as seen through the edge proxy: first `X-Forwarded-For`
/// entry, then `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or("").trim().to_string())
            .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("unknown"))
    };
    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .or_else(|| peer.map(|p| p.ip().to_string()))
}

pub async fn caller_source(
    State(state): State<AppState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Json<serde_json::Value> {
    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr)).unwrap_or_default();
    let source = state.geo.resolve(&ip).await;
    ok(serde_json::json!({ "ip": ip, "source": source }))
}

pub async fn ip_source(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Json<serde_json::Value> {
    let source = state.geo.resolve(&ip).await;
    ok(serde_json::json!({ "ip": ip, "source": source }))
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    ok(serde_json::json!({
        "size": state.geo.cached_len(),
        "maxEntries": state.config.geo.max_entries,
    }))
}

pub async fn clear_cache(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.geo.clear_cache();
    ok(serde_json::json!({ "size": 0 }))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn unknown_forwarded_for_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("unknown"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers, None).as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn socket_peer_is_last_resort() {
        let peer: SocketAddr = "[2001:db8::1]:443".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)).as_deref(), Some("2001:db8::1"));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }
}
