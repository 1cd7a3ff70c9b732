use std::time::Duration;

use iw_domain::config::AiConfig;
use iw_domain::error::Result;
use iw_domain::message::ChatMessage;
use serde::Serialize;

use crate::http::HttpCall;

/// Where and as whom to call the provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl ProviderSettings {
    pub fn from_config(cfg: &AiConfig) -> Self {
        Self {
            api_url: cfg.api_url.clone(),
            model: cfg.model.clone(),
            api_key: cfg.resolve_api_key(),
        }
    }

    /// Wrap a request body into a call against the configured endpoint.
    pub fn call(&self, request: &CompletionRequest, read_timeout: Duration) -> Result<HttpCall> {
        Ok(HttpCall {
            url: self.api_url.clone(),
            bearer: self.api_key.clone(),
            body: serde_json::to_value(request)?,
            read_timeout,
        })
    }
}

/// Body of an OpenAI-compatible chat-completions call.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Temperature is clamped into `[0, 2]` and `max_tokens` raised to at
    /// least 1.
    pub fn new(
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
        stream: bool,
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        let temperature = if temperature.is_finite() {
            temperature.clamp(0.0, 2.0)
        } else {
            1.0
        };
        Self {
            model: model.into(),
            messages,
            stream,
            temperature,
            max_tokens: max_tokens.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_matches_wire_shape() {
        let req = CompletionRequest::new(
            "deepseek-chat",
            vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            false,
            0.5,
            300,
        );
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "deepseek-chat",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hi"}
                ],
                "stream": false,
                "temperature": 0.5,
                "max_tokens": 300
            })
        );
    }

    #[test]
    fn out_of_range_parameters_are_clamped() {
        let req = CompletionRequest::new("m", vec![], true, 3.5, 0);
        assert_eq!(req.temperature, 2.0);
        assert_eq!(req.max_tokens, 1);

        let req = CompletionRequest::new("m", vec![], true, -1.0, 10);
        assert_eq!(req.temperature, 0.0);
    }

    #[test]
    fn call_carries_bearer_and_timeout() {
        let settings = ProviderSettings {
            api_url: "https://llm.test/chat/completions".into(),
            model: "m".into(),
            api_key: Some("sk-1".into()),
        };
        let req = CompletionRequest::new("m", vec![], false, 0.7, 10);
        let call = settings.call(&req, Duration::from_secs(120)).unwrap();
        assert_eq!(call.url, "https://llm.test/chat/completions");
        assert_eq!(call.bearer.as_deref(), Some("sk-1"));
        assert_eq!(call.read_timeout, Duration::from_secs(120));
        assert_eq!(call.body["stream"], json!(false));
    }
}
