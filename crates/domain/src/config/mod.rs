mod ai;
mod geo;
mod observability;
mod server;

pub use ai::*;
pub use geo::*;
pub use observability::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self { severity: ConfigSeverity::Error, field: field.into(), message: message.into() }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self { severity: ConfigSeverity::Warning, field: field.into(), message: message.into() }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good. A missing API key
    /// is only a warning: calls fail with the provider's auth error.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.identity_header.trim().is_empty() {
            errors.push(ConfigError::error(
                "server.identity_header",
                "identity header name must not be empty",
            ));
        }

        if self.ai.api_url.is_empty() {
            errors.push(ConfigError::error("ai.api_url", "api_url must not be empty"));
        }
        if self.ai.model.is_empty() {
            errors.push(ConfigError::error("ai.model", "model must not be empty"));
        }
        if self.ai.resolve_api_key().is_none() {
            errors.push(ConfigError::warning(
                "ai.api_key",
                format!("no api key configured and ${} is unset", self.ai.api_key_env),
            ));
        }
        for (field, secs) in [
            ("ai.connect_timeout_secs", self.ai.connect_timeout_secs),
            ("ai.read_timeout_secs", self.ai.read_timeout_secs),
            ("ai.long_read_timeout_secs", self.ai.long_read_timeout_secs),
            ("ai.chat_session_timeout_secs", self.ai.chat_session_timeout_secs),
            ("ai.long_session_timeout_secs", self.ai.long_session_timeout_secs),
        ] {
            if secs == 0 {
                errors.push(ConfigError::error(field, "timeout must be greater than 0"));
            }
        }
        if self.ai.relay_buffer == 0 {
            errors.push(ConfigError::error("ai.relay_buffer", "relay_buffer must be greater than 0"));
        }

        if self.geo.max_entries == 0 {
            errors.push(ConfigError::warning(
                "geo.max_entries",
                "cache bound is 0; every lookup will go to the network",
            ));
        }

        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        errors
    }
}
