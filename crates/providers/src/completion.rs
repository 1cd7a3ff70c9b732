use std::sync::Arc;
use std::time::Duration;

use iw_domain::error::{Error, Result};
use iw_domain::message::ChatMessage;
use serde_json::Value;

use crate::http::HttpTransport;
use crate::request::{CompletionRequest, ProviderSettings};

#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f64,
    pub max_tokens: u32,
    pub read_timeout: Duration,
}

/// Single-shot completions: one system prompt, one user message, one
/// call, one answer.
pub struct CompletionEngine {
    transport: Arc<dyn HttpTransport>,
    settings: ProviderSettings,
}

impl CompletionEngine {
    pub fn new(transport: Arc<dyn HttpTransport>, settings: ProviderSettings) -> Self {
        Self { transport, settings }
    }

    /// Returns the first choice's content, trimmed, or `""` when the
    /// provider sent no content. No retries.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        params: CompletionParams,
    ) -> Result<String> {
        let request = CompletionRequest::new(
            &self.settings.model,
            vec![ChatMessage::system(system_prompt), ChatMessage::user(user_message)],
            false,
            params.temperature,
            params.max_tokens,
        );
        let call = self.settings.call(&request, params.read_timeout)?;

        tracing::debug!(
            model = %request.model,
            max_tokens = request.max_tokens,
            input_chars = user_message.chars().count(),
            "completion request"
        );

        let reply = self.transport.call_once(call).await?;
        if !reply.is_success() {
            tracing::warn!(status = reply.status, "provider rejected completion");
            return Err(Error::Provider {
                status: reply.status,
                body: reply.body,
            });
        }

        extract_content(&reply.body)
    }
}

/// Pull `choices[0].message.content` out of a completion body.
pub(crate) fn extract_content(body: &str) -> Result<String> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| Error::MalformedResponse(e.to_string()))?;
    Ok(json
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
