use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AI provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Settings for the single OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "d_api_url")]
    pub api_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Inline key. Takes precedence over `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    /// Default system prompt, used by the chat operations.
    #[serde(default = "d_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "d_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout for one-shot completions and ordinary streams.
    #[serde(default = "d_read_timeout")]
    pub read_timeout_secs: u64,
    /// Read timeout for long-form streams (content optimization).
    #[serde(default = "d_long_read_timeout")]
    pub long_read_timeout_secs: u64,
    /// Whole-session deadline for chat relays.
    #[serde(default = "d_chat_session_timeout")]
    pub chat_session_timeout_secs: u64,
    /// Whole-session deadline for long-form relays.
    #[serde(default = "d_long_session_timeout")]
    pub long_session_timeout_secs: u64,
    /// Capacity of the per-session event channel.
    #[serde(default = "d_relay_buffer")]
    pub relay_buffer: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_url: d_api_url(),
            model: d_model(),
            api_key: None,
            api_key_env: d_api_key_env(),
            system_prompt: d_system_prompt(),
            connect_timeout_secs: d_connect_timeout(),
            read_timeout_secs: d_read_timeout(),
            long_read_timeout_secs: d_long_read_timeout(),
            chat_session_timeout_secs: d_chat_session_timeout(),
            long_session_timeout_secs: d_long_session_timeout(),
            relay_buffer: d_relay_buffer(),
        }
    }
}

impl AiConfig {
    /// The inline key if set and non-empty, else the env var's value.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
    pub fn long_read_timeout(&self) -> Duration {
        Duration::from_secs(self.long_read_timeout_secs)
    }
    pub fn chat_session_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_session_timeout_secs)
    }
    pub fn long_session_timeout(&self) -> Duration {
        Duration::from_secs(self.long_session_timeout_secs)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_api_url() -> String {
    "https://api.deepseek.com/chat/completions".into()
}
fn d_model() -> String {
    "deepseek-chat".into()
}
fn d_api_key_env() -> String {
    "DEEPSEEK_API_KEY".into()
}
fn d_system_prompt() -> String {
    "你是一个博客智能助手，帮助用户解答技术问题。请用简洁、专业的中文回答，支持 Markdown 格式。".into()
}
fn d_connect_timeout() -> u64 {
    30
}
fn d_read_timeout() -> u64 {
    120
}
fn d_long_read_timeout() -> u64 {
    300
}
fn d_chat_session_timeout() -> u64 {
    180
}
fn d_long_session_timeout() -> u64 {
    300
}
fn d_relay_buffer() -> usize {
    64
}
