use iw_domain::config::{Config, ConfigSeverity};

/// Print every validation issue plus a one-line summary. Returns `false`
/// when any issue is an error.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    for issue in &issues {
        println!("{issue}");
    }

    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    let warnings = issues.len() - errors;

    let key_source = if config.ai.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) {
        "inline".to_string()
    } else if config.ai.resolve_api_key().is_some() {
        format!("env:{}", config.ai.api_key_env)
    } else {
        "missing".to_string()
    };

    if issues.is_empty() {
        println!("Config OK ({config_path}), AI key: {key_source}");
    } else {
        println!("\n{errors} error(s), {warnings} warning(s) in {config_path}, AI key: {key_source}");
    }

    errors == 0
}

/// Dump the resolved config (defaults filled in) as TOML, with any
/// inline API key masked.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let mut redacted = config.clone();
    redacted.ai.api_key = redacted.ai.api_key.as_deref().map(mask_secret);
    print!("{}", toml::to_string_pretty(&redacted)?);
    Ok(())
}

/// Keep the first four characters, star the rest.
fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    let hidden = secret.chars().count().saturating_sub(4).min(8);
    format!("{visible}{}", "*".repeat(hidden))
}
