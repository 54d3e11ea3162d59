//! Command-line interface definition.

use std::net::IpAddr;
use std::path::PathBuf;

use calproxy_core::TracingOutputFormat;
use clap::{Parser, Subcommand};

use crate::config::{AuthMode, ServerConfig};

/// calproxy - Google Calendar events over a small REST API
#[derive(Debug, Parser)]
#[command(name = "calproxy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALPROXY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listening port
    #[arg(long, short, env = "PORT")]
    pub port: Option<u16>,

    /// Listening address
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Path to the Google Cloud Console OAuth client JSON
    #[arg(long, env = "CALPROXY_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Path to the persisted OAuth token
    #[arg(long, env = "CALPROXY_TOKEN")]
    pub token: Option<PathBuf>,

    /// How the authorization code is supplied (console or callback)
    #[arg(long)]
    pub auth_mode: Option<AuthMode>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log output format (pretty, compact or json)
    #[arg(long, default_value = "compact")]
    pub log_format: TracingOutputFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the authorization flow on this terminal and save the token
    Auth {
        /// Authorize again even if a usable token is saved
        #[arg(long, short)]
        force: bool,
    },

    /// Serve the events API (default)
    Serve,
}

impl Cli {
    /// Applies command-line overrides on top of `config`.
    pub fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(ref credentials) = self.credentials {
            config.credentials_path = credentials.clone();
        }
        if let Some(ref token) = self.token {
            config.token_path = token.clone();
        }
        if let Some(auth_mode) = self.auth_mode {
            config.auth_mode = auth_mode;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "calproxy",
            "--port",
            "8080",
            "--bind",
            "127.0.0.1",
            "--token",
            "/tmp/token.json",
            "--auth-mode",
            "callback",
        ])
        .unwrap();

        let config = cli.apply(ServerConfig {
            calendar_id: "team".to_string(),
            ..Default::default()
        });

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.token_path, PathBuf::from("/tmp/token.json"));
        assert_eq!(config.auth_mode, AuthMode::Callback);
        assert_eq!(config.calendar_id, "team");
    }

    #[test]
    fn no_flags_keep_config() {
        let cli = Cli::try_parse_from(["calproxy", "--credentials", "creds.json"]).unwrap();
        let config = cli.apply(ServerConfig::default());
        assert_eq!(config.credentials_path, PathBuf::from("creds.json"));
        assert_eq!(config.token_path, PathBuf::from("token.json"));
        assert!(cli.command.is_none());
        assert_eq!(cli.log_format, TracingOutputFormat::Compact);
    }

    #[test]
    fn auth_subcommand() {
        let cli = Cli::try_parse_from(["calproxy", "auth", "--force"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Auth { force: true })));
    }

    #[test]
    fn invalid_auth_mode_rejected() {
        assert!(Cli::try_parse_from(["calproxy", "--auth-mode", "device"]).is_err());
    }
}
