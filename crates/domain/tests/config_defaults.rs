use iw_domain::config::{Config, ConfigSeverity};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8090);
}

#[test]
fn empty_file_yields_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.ai.model, "deepseek-chat");
    assert_eq!(config.ai.api_url, "https://api.deepseek.com/chat/completions");
    assert_eq!(config.ai.relay_buffer, 64);
    assert_eq!(config.geo.max_entries, 4096);
    assert_eq!(config.geo.unknown_label, "未知");
}

#[test]
fn default_timeouts_follow_operation_classes() {
    let ai = Config::default().ai;
    assert_eq!(ai.connect_timeout_secs, 30);
    assert_eq!(ai.read_timeout_secs, 120);
    assert_eq!(ai.long_read_timeout_secs, 300);
    assert_eq!(ai.chat_session_timeout_secs, 180);
    assert_eq!(ai.long_session_timeout_secs, 300);
}

#[test]
fn sections_parse_independently() {
    let toml_str = r#"
[server]
host = "0.0.0.0"

[ai]
model = "deepseek-reasoner"
api_key = "sk-test"

[geo]
max_entries = 16
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8090);
    assert_eq!(config.ai.model, "deepseek-reasoner");
    assert_eq!(config.ai.resolve_api_key().as_deref(), Some("sk-test"));
    assert_eq!(config.geo.max_entries, 16);
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config.server.cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    assert!(config.server.cors.allowed_origins.contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn wildcard_cors_is_only_a_warning() {
    let toml_str = r#"
[server.cors]
allowed_origins = ["*"]

[ai]
api_key = "sk-test"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, ConfigSeverity::Warning);
}

#[test]
fn empty_model_is_an_error() {
    let mut config = Config::default();
    config.ai.model.clear();
    assert!(config
        .validate()
        .iter()
        .any(|e| e.field == "ai.model" && e.severity == ConfigSeverity::Error));
}
