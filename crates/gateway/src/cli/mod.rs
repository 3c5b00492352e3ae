pub mod config;
pub mod issue_key;

use clap::{Parser, Subcommand};

/// SeoX: metered SEO description generation API.
#[derive(Debug, Parser)]
#[command(name = "seox", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Issue an API key directly against the configured store.
    IssueKey {
        /// Plan name from `[plans]`.
        #[arg(long)]
        plan: String,
        /// Registered user id to link the key to.
        #[arg(long)]
        owner: Option<u64>,
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

/// Load the configuration from the path specified by `SEOX_CONFIG` (or
/// `config.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.  A missing file yields the defaults.
///
/// [`Config`]: sx_domain::config::Config
pub fn load_config() -> anyhow::Result<(sx_domain::config::Config, String)> {
    let config_path = std::env::var("SEOX_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(config_path: &str) -> anyhow::Result<sx_domain::config::Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(sx_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_config_from("/nonexistent/seox-config.toml").unwrap();
        assert_eq!(cfg.server.port, 8000);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        let err = load_config_from(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn issue_key_arguments_parse() {
        let cli = Cli::try_parse_from(["seox", "issue-key", "--plan", "pro", "--owner", "3"]).unwrap();
        match cli.command {
            Some(Command::IssueKey { plan, owner }) => {
                assert_eq!(plan, "pro");
                assert_eq!(owner, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["seox"]).unwrap();
        assert!(cli.command.is_none());
    }
}
