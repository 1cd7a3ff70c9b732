use iw_domain::config::GeoConfig;
use iw_domain::error::{Error, Result};
use serde::Deserialize;

use crate::compose::compose_source;

/// One external IP-location service.
#[async_trait::async_trait]
pub trait GeoLookup: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` means the service answered but had nothing usable.
    async fn lookup(&self, ip: &str) -> Result<Option<String>>;
}

/// Short-timeout client shared by the lookups.
pub fn build_client(cfg: &GeoConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(cfg.connect_timeout())
        .timeout(cfg.connect_timeout() + cfg.read_timeout())
        .user_agent(concat!("inkwell/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Config(format!("building geo HTTP client: {e}")))
}

async fn fetch(client: &reqwest::Client, url: &str, fallback_charset: &str) -> Result<String> {
    let resp = client.get(url).send().await.map_err(Error::from)?;
    let status = resp.status();
    let body = resp
        .text_with_charset(fallback_charset)
        .await
        .map_err(Error::from)?;
    if !status.is_success() {
        return Err(Error::Provider {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Primary: `{code, data: {country, province, city, isp}}`
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct BilibiliLookup {
    client: reqwest::Client,
    base_url: String,
}

impl BilibiliLookup {
    /// `base_url` gets the address appended verbatim.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[derive(Deserialize)]
struct ZoneEnvelope {
    code: i64,
    #[serde(default)]
    data: Option<ZoneData>,
}

#[derive(Deserialize)]
struct ZoneData {
    country: Option<String>,
    province: Option<String>,
    city: Option<String>,
    isp: Option<String>,
}

pub(crate) fn parse_zone(body: &str) -> Result<Option<String>> {
    let envelope: ZoneEnvelope = serde_json::from_str(body.trim())?;
    if envelope.code != 0 {
        return Ok(None);
    }
    Ok(envelope.data.and_then(|d| {
        compose_source(
            d.country.as_deref(),
            d.province.as_deref(),
            d.city.as_deref(),
            d.isp.as_deref(),
        )
    }))
}

#[async_trait::async_trait]
impl GeoLookup for BilibiliLookup {
    fn name(&self) -> &str {
        "bilibili"
    }

    async fn lookup(&self, ip: &str) -> Result<Option<String>> {
        let url = format!("{}{}", self.base_url, ip);
        let body = fetch(&self.client, &url, "utf-8").await?;
        parse_zone(&body)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fallback: `{pro, city, addr}`, usually GBK encoded
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct PcOnlineLookup {
    client: reqwest::Client,
    url_template: String,
}

impl PcOnlineLookup {
    /// `url_template` must contain `{ip}`.
    pub fn new(client: reqwest::Client, url_template: impl Into<String>) -> Self {
        Self {
            client,
            url_template: url_template.into(),
        }
    }
}

#[derive(Deserialize)]
struct WhoisReply {
    pro: Option<String>,
    city: Option<String>,
    addr: Option<String>,
}

pub(crate) fn parse_whois(body: &str) -> Result<Option<String>> {
    let reply: WhoisReply = serde_json::from_str(body.trim())?;
    Ok(compose_source(
        None,
        reply.pro.as_deref(),
        reply.city.as_deref(),
        reply.addr.as_deref(),
    ))
}

#[async_trait::async_trait]
impl GeoLookup for PcOnlineLookup {
    fn name(&self) -> &str {
        "pconline"
    }

    async fn lookup(&self, ip: &str) -> Result<Option<String>> {
        let url = self.url_template.replace("{ip}", ip);
        let body = fetch(&self.client, &url, "gbk").await?;
        parse_whois(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_success() {
        let body = r#"{"code":0,"message":"0","data":{"addr":"1.2.3.4","country":"中国","province":"浙江","city":"杭州","isp":"电信","latitude":30.2,"longitude":120.1}}"#;
        assert_eq!(parse_zone(body).unwrap().as_deref(), Some("中国|浙江|杭州|电信"));
    }

    #[test]
    fn zone_nonzero_code_is_empty() {
        let body = r#"{"code":-400,"message":"请求错误","data":null}"#;
        assert_eq!(parse_zone(body).unwrap(), None);
    }

    #[test]
    fn zone_garbage_is_error() {
        assert!(parse_zone("<html>").is_err());
    }

    #[test]
    fn whois_maps_into_same_format() {
        let body = r#"  {"ip":"1.2.3.4","pro":"广东省","proCode":"440000","city":"深圳市","cityCode":"440300","addr":"广东省深圳市 电信","err":""}
"#;
        assert_eq!(
            parse_whois(body).unwrap().as_deref(),
            Some("广东省|深圳市|广东省深圳市 电信")
        );
    }

    #[test]
    fn whois_all_empty_is_none() {
        let body = r#"{"pro":"","city":"","addr":""}"#;
        assert_eq!(parse_whois(body).unwrap(), None);
    }
}
