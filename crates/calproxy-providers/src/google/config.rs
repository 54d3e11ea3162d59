//! Google Calendar access configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ProviderError, ProviderResult};

use super::credentials::ClientCredentials;

/// Google OAuth authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Google OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Configuration for authorizing against and calling Google Calendar.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth client credentials.
    pub credentials: ClientCredentials,

    /// Path of the persisted token.
    pub token_path: PathBuf,

    /// Calendar the event operations act on.
    pub calendar_id: String,

    /// OAuth scopes requested during the interactive exchange.
    pub scopes: Vec<String>,

    /// Calendar API base URL.
    pub api_base_url: String,

    /// OAuth authorization endpoint.
    pub auth_url: String,

    /// OAuth token endpoint.
    pub token_url: String,

    /// Optional per-request timeout. `None` leaves it to the transport.
    pub timeout: Option<Duration>,

    /// User agent string for outgoing requests.
    pub user_agent: String,
}

impl GoogleConfig {
    /// Default OAuth scope: read/write access to calendars.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Default token file, relative to the working directory.
    pub const DEFAULT_TOKEN_PATH: &'static str = "token.json";

    /// Creates a configuration with Google's production endpoints.
    pub fn new(credentials: ClientCredentials) -> Self {
        Self {
            credentials,
            token_path: PathBuf::from(Self::DEFAULT_TOKEN_PATH),
            calendar_id: "primary".to_string(),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            api_base_url: CALENDAR_API_BASE.to_string(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            timeout: None,
            user_agent: format!("calproxy/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the calendar ID.
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the Calendar API base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Sets the OAuth authorization endpoint.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Sets the OAuth token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the HTTP client shared by OAuth and calendar calls.
    pub fn http_client(&self) -> ProviderResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(&self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(|e| {
            ProviderError::internal(format!("failed to create HTTP client: {}", e)).with_source(e)
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ProviderResult<()> {
        self.credentials.validate()?;

        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }

        if self.calendar_id.is_empty() {
            return Err(ProviderError::configuration("calendar_id must not be empty"));
        }

        for (name, value) in [
            ("api_base_url", &self.api_base_url),
            ("auth_url", &self.auth_url),
            ("token_url", &self.token_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                ProviderError::configuration(format!("invalid {} '{}': {}", name, value, e))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> ClientCredentials {
        ClientCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn config_defaults() {
        let config = GoogleConfig::new(test_credentials());
        assert_eq!(config.calendar_id, "primary");
        assert_eq!(config.scopes, vec![GoogleConfig::DEFAULT_SCOPE.to_string()]);
        assert_eq!(config.token_path, PathBuf::from("token.json"));
        assert_eq!(config.api_base_url, CALENDAR_API_BASE);
        assert!(config.timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_builder_methods() {
        let config = GoogleConfig::new(test_credentials())
            .with_token_path("/tmp/token.json")
            .with_calendar_id("team@example.com")
            .with_api_base_url("http://127.0.0.1:9000/calendar/v3")
            .with_token_url("http://127.0.0.1:9000/token")
            .with_timeout(Some(Duration::from_secs(10)));

        assert_eq!(config.token_path, PathBuf::from("/tmp/token.json"));
        assert_eq!(config.calendar_id, "team@example.com");
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000/calendar/v3");
        assert_eq!(config.token_url, "http://127.0.0.1:9000/token");
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn config_validation() {
        let no_scopes = GoogleConfig::new(test_credentials()).with_scopes(vec![]);
        assert!(no_scopes.validate().is_err());

        let bad_url = GoogleConfig::new(test_credentials()).with_api_base_url("not a url");
        let err = bad_url.validate().unwrap_err();
        assert!(err.message().contains("api_base_url"));

        let no_calendar = GoogleConfig::new(test_credentials()).with_calendar_id("");
        assert!(no_calendar.validate().is_err());
    }

    #[test]
    fn http_client_builds() {
        let config = GoogleConfig::new(test_credentials()).with_timeout(Some(Duration::from_secs(5)));
        assert!(config.http_client().is_ok());
    }
}
