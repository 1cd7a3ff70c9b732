use std::time::Duration;

use futures_util::StreamExt;
use iw_domain::error::{Error, Result};
use iw_domain::stream::{BoxStream, ProviderEvent};
use serde_json::Value;

use crate::sse::sse_event_stream;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Call / reply types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One outbound JSON POST.
#[derive(Debug, Clone)]
pub struct HttpCall {
    pub url: String,
    /// Sent as `Authorization: Bearer <key>` when present.
    pub bearer: Option<String>,
    pub body: Value,
    /// Bounds the whole exchange for one-shot calls; for streams it bounds
    /// the wait for headers and for every subsequent chunk.
    pub read_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The seam both engines talk through. [`CallClient`] is the real one;
/// tests script their own.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue one request and read the full body. Non-success statuses are
    /// returned as a reply, not an error.
    async fn call_once(&self, call: HttpCall) -> Result<HttpReply>;

    /// Open a provider event stream. The connection is made lazily when
    /// the stream is first polled; dropping the stream releases it.
    ///
    /// The stream always ends with one `Closed` or `Failed`. A non-success
    /// status yields a single `Failed(Error::Provider { .. })`.
    fn open_stream(&self, call: HttpCall) -> BoxStream<'static, ProviderEvent>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// reqwest-backed client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-wide outbound client. Built once; cloning shares the pool.
#[derive(Clone)]
pub struct CallClient {
    client: reqwest::Client,
}

impl CallClient {
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Error::Config(format!("building HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn post(&self, call: &HttpCall) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(&call.url)
            .header("Content-Type", "application/json")
            .json(&call.body);
        match &call.bearer {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for CallClient {
    async fn call_once(&self, call: HttpCall) -> Result<HttpReply> {
        tracing::debug!(url = %call.url, timeout_secs = call.read_timeout.as_secs(), "outbound call");

        let resp = self
            .post(&call)
            .timeout(call.read_timeout)
            .send()
            .await
            .map_err(Error::from)?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(Error::from)?;
        Ok(HttpReply { status, body })
    }

    fn open_stream(&self, call: HttpCall) -> BoxStream<'static, ProviderEvent> {
        let request = self.post(&call);
        let read_timeout = call.read_timeout;
        let url = call.url;

        let stream = async_stream::stream! {
            tracing::debug!(url = %url, "opening provider stream");

            let response = match tokio::time::timeout(read_timeout, request.send()).await {
                Ok(Ok(resp)) => Some(resp),
                Ok(Err(e)) => {
                    yield ProviderEvent::Failed(Error::from(e));
                    None
                }
                Err(_) => {
                    yield ProviderEvent::Failed(Error::Timeout(format!(
                        "no response headers within {}s",
                        read_timeout.as_secs()
                    )));
                    None
                }
            };

            if let Some(response) = response {
                let status = response.status();
                if status.is_success() {
                    let mut events = sse_event_stream(response, read_timeout);
                    while let Some(event) = events.next().await {
                        yield event;
                    }
                } else {
                    let body = match tokio::time::timeout(read_timeout, response.text()).await {
                        Ok(Ok(text)) => text,
                        _ => String::new(),
                    };
                    yield ProviderEvent::Failed(Error::Provider {
                        status: status.as_u16(),
                        body,
                    });
                }
            }
        };

        Box::pin(stream)
    }
}
