pub mod ask;
pub mod config;

use clap::{Parser, Subcommand};

/// Inkwell — AI relay and IP-location service for the blog backend.
#[derive(Debug, Parser)]
#[command(name = "inkwell", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Run one AI operation against the configured provider and print the
    /// answer.
    Ask {
        /// chat, summary, quick-read, title, category, tags or optimize.
        operation: String,
        /// Input text; `-` reads standard input.
        text: String,
        /// Existing categories or tags, comma separated (category / tags only).
        #[arg(long, value_delimiter = ',')]
        existing: Vec<String>,
    },
    /// Resolve an IP address to its location.
    Ip {
        addr: String,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `IW_CONFIG` (or
/// `config.toml` by default). A missing file means all defaults.
pub fn load_config() -> anyhow::Result<(iw_domain::config::Config, String)> {
    let config_path = std::env::var("IW_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        iw_domain::config::Config::default()
    };

    Ok((config, config_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["inkwell"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn ask_takes_existing_list() {
        let cli = Cli::try_parse_from([
            "inkwell", "ask", "tags", "正文", "--existing", "Rust,Tokio",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Ask { operation, text, existing }) => {
                assert_eq!(operation, "tags");
                assert_eq!(text, "正文");
                assert_eq!(existing, vec!["Rust", "Tokio"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_subcommands_parse() {
        let cli = Cli::try_parse_from(["inkwell", "config", "validate"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Config(ConfigCommand::Validate))));
    }
}
