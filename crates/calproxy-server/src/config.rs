//! Server configuration.
//!
//! Settings come from an optional `config.toml`
//! (`~/.config/calproxy/config.toml` by default); every key has a default, so
//! the proxy runs without any file. Command-line flags override the file.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use calproxy_providers::google::{
    CALENDAR_API_BASE, ClientCredentials, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GoogleConfig,
};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 5000;

/// Path of the authorization callback route.
pub const CALLBACK_PATH: &str = "/oauth2/callback";

/// How the operator hands the authorization code to the proxy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Code is typed on the proxy's terminal.
    #[default]
    Console,
    /// Code arrives on `GET /oauth2/callback`.
    Callback,
}

impl AuthMode {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Callback => "callback",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "callback" => Ok(Self::Callback),
            other => Err(format!(
                "unknown auth mode '{}' (expected console or callback)",
                other
            )),
        }
    }
}

/// Configuration for the calproxy server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,

    /// Listening address.
    pub bind_address: IpAddr,

    /// Google Cloud Console OAuth client JSON.
    pub credentials_path: PathBuf,

    /// Persisted OAuth token.
    pub token_path: PathBuf,

    /// Calendar the events routes act on.
    pub calendar_id: String,

    /// OAuth scopes requested during authorization.
    pub scopes: Vec<String>,

    /// How the authorization code is obtained.
    pub auth_mode: AuthMode,

    /// Open the consent URL in a browser (console mode).
    pub open_browser: bool,

    /// Timeout for Google API requests, in seconds. None waits forever.
    pub request_timeout_secs: Option<u64>,

    /// Redirect URI sent to Google, overriding the credentials file.
    pub redirect_uri: Option<String>,

    /// Google Calendar API base URL.
    pub api_base_url: String,

    /// OAuth authorization endpoint.
    pub auth_url: String,

    /// OAuth token endpoint.
    pub token_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from(GoogleConfig::DEFAULT_TOKEN_PATH),
            calendar_id: "primary".to_string(),
            scopes: vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
            auth_mode: AuthMode::default(),
            open_browser: false,
            request_timeout_secs: None,
            redirect_uri: None,
            api_base_url: CALENDAR_API_BASE.to_string(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from `path`, or from the default path when it exists.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::config_file(path, format!("failed to read config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| ServerError::config_file(path, format!("failed to parse config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calproxy")
            .join("config.toml")
    }

    /// Returns the listening socket address.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Returns the Google API request timeout.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Returns the redirect URI registered with authorization requests.
    ///
    /// In callback mode this defaults to the proxy's own callback route.
    pub fn effective_redirect_uri(&self) -> Option<String> {
        match (&self.redirect_uri, self.auth_mode) {
            (Some(uri), _) => Some(uri.clone()),
            (None, AuthMode::Callback) => {
                Some(format!("http://localhost:{}{}", self.port, CALLBACK_PATH))
            }
            (None, AuthMode::Console) => None,
        }
    }

    /// Reads the credentials file and builds the provider configuration.
    pub fn load_google_config(&self) -> ServerResult<GoogleConfig> {
        let credentials = ClientCredentials::from_file(&self.credentials_path)?;
        self.to_google_config(credentials)
    }

    /// Builds the provider configuration around `credentials`.
    pub fn to_google_config(&self, credentials: ClientCredentials) -> ServerResult<GoogleConfig> {
        let credentials = match self.effective_redirect_uri() {
            Some(uri) => credentials.with_redirect_uris(vec![uri]),
            None => credentials,
        };

        let config = GoogleConfig::new(credentials)
            .with_token_path(&self.token_path)
            .with_calendar_id(&self.calendar_id)
            .with_scopes(self.scopes.clone())
            .with_api_base_url(&self.api_base_url)
            .with_auth_url(&self.auth_url)
            .with_token_url(&self.token_url)
            .with_timeout(self.request_timeout());

        config.validate()?;
        Ok(config)
    }
}
