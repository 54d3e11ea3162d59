//! OAuth client credentials loaded from a Google Cloud Console JSON file.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 client credentials.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
    /// Registered redirect targets. The first one is used for authorization.
    pub redirect_uris: Vec<String>,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl ClientCredentials {
    /// Redirect target used for installed apps that registered none.
    pub const DEFAULT_REDIRECT_URI: &'static str = "http://localhost";

    /// Creates new credentials with the default redirect target.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uris: vec![Self::DEFAULT_REDIRECT_URI.to_string()],
        }
    }

    /// Replaces the redirect targets.
    pub fn with_redirect_uris(mut self, uris: Vec<String>) -> Self {
        if !uris.is_empty() {
            self.redirect_uris = uris;
        }
        self
    }

    /// Loads credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        let credentials = Self::from_json(&content)?;
        debug!(path = %path.display(), "loaded client credentials");
        Ok(credentials)
    }

    /// Parses credentials from a Google credentials JSON string.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret)
                .with_redirect_uris(creds.redirect_uris));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret).with_redirect_uris(file.redirect_uris));
        }

        Err(ProviderError::configuration(
            "credentials file must contain an 'installed'/'web' section or 'client_id'/'client_secret' at root level",
        ))
    }

    /// Returns the redirect target sent with authorization requests.
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(Self::DEFAULT_REDIRECT_URI)
    }

    /// Checks that the credentials are usable.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.client_id.is_empty() {
            return Err(ProviderError::configuration("client_id is required"));
        }
        if self.client_secret.is_empty() {
            return Err(ProviderError::configuration("client_secret is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    #[test]
    fn from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "my-project",
                "redirect_uris": ["urn:ietf:wg:oauth:2.0:oob", "http://localhost"]
            }
        }"#;

        let creds = ClientCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
        assert_eq!(creds.redirect_uri(), "urn:ietf:wg:oauth:2.0:oob");
        assert_eq!(creds.redirect_uris.len(), 2);
    }

    #[test]
    fn from_json_web() {
        let json = r#"{
            "web": {
                "client_id": "web-id.apps.googleusercontent.com",
                "client_secret": "web-secret",
                "redirect_uris": ["http://localhost:5000/oauth2/callback"]
            }
        }"#;

        let creds = ClientCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-id.apps.googleusercontent.com");
        assert_eq!(creds.redirect_uri(), "http://localhost:5000/oauth2/callback");
    }

    #[test]
    fn from_json_flat_without_redirects() {
        let json = r#"{
            "client_id": "flat-id.apps.googleusercontent.com",
            "client_secret": "flat-secret"
        }"#;

        let creds = ClientCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_secret, "flat-secret");
        assert_eq!(creds.redirect_uri(), ClientCredentials::DEFAULT_REDIRECT_URI);
    }

    #[test]
    fn from_json_missing_sections() {
        let err = ClientCredentials::from_json(r#"{ "other": {} }"#).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert!(err.message().contains("client_id"));
    }

    #[test]
    fn from_json_malformed() {
        let err = ClientCredentials::from_json("not json").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert!(err.message().contains("parse"));
    }

    #[test]
    fn from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientCredentials::from_file(dir.path().join("credentials.json")).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert!(err.message().contains("failed to read"));
    }

    #[test]
    fn from_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"installed": {"client_id": "id", "client_secret": "secret"}}"#,
        )
        .unwrap();

        let creds = ClientCredentials::from_file(&path).unwrap();
        assert_eq!(creds, ClientCredentials::new("id", "secret"));
    }

    #[test]
    fn validation() {
        assert!(ClientCredentials::new("id", "secret").validate().is_ok());
        assert!(ClientCredentials::new("", "secret").validate().is_err());
        assert!(ClientCredentials::new("id", "").validate().is_err());
    }
}
