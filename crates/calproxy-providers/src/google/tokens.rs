//! OAuth token persistence.
//!
//! The token file uses the same JSON layout Google's client libraries write,
//! so an existing `token.json` keeps working:
//!
//! ```json
//! {"access_token": "...", "refresh_token": "...", "scope": "...",
//!  "token_type": "Bearer", "expiry_date": 1718000000000}
//! ```
//!
//! Nothing is cached in memory: every call to
//! [`TokenStorage::load`] reads the file again.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Tokens are treated as expired this long before their actual expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// A persisted OAuth token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Space-separated granted scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Token type, normally `Bearer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Expiry as milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl StoredToken {
    /// Creates a token from token-endpoint data, relative to `now`.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            scope: None,
            token_type: Some("Bearer".to_string()),
            expiry_date: expires_in_secs
                .map(|secs| (now + Duration::seconds(secs)).timestamp_millis()),
        }
    }

    /// Sets the granted scope.
    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    /// Returns the expiry instant, if known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry_date
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    /// Returns true if the token is expired or about to expire at `now`.
    ///
    /// Tokens without an expiry never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expires_at,
            None => false,
        }
    }

    /// Returns true if the token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Folds a refreshed token into this one.
    ///
    /// Google usually omits the refresh token from refresh responses; the
    /// previous one is kept in that case.
    pub fn refreshed(self, fresh: StoredToken) -> StoredToken {
        StoredToken {
            refresh_token: fresh.refresh_token.or(self.refresh_token),
            scope: fresh.scope.or(self.scope),
            ..fresh
        }
    }
}

/// File-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    /// Creates a token storage at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the persisted token.
    ///
    /// Returns `Ok(None)` when no token file exists and an error when the
    /// file exists but cannot be read or parsed.
    pub fn load(&self) -> ProviderResult<Option<StoredToken>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no token file");
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {}", e))
                .with_source(e)
        })?;

        let token: StoredToken = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!("failed to parse token file: {}", e))
                .with_source(e)
        })?;

        debug!(path = %self.path.display(), "loaded token");
        Ok(Some(token))
    }

    /// Writes the token, replacing any previous one.
    pub fn save(&self, token: &StoredToken) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(token)
            .map_err(|e| ProviderError::internal(format!("failed to serialize token: {}", e)))?;

        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {}", e))
        })?;

        info!(path = %self.path.display(), "token stored");
        Ok(())
    }

    /// Returns the token storage path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_in(dir: &tempfile::TempDir) -> TokenStorage {
        TokenStorage::new(dir.path().join("token.json"))
    }

    #[test]
    fn token_creation() {
        let now = Utc::now();
        let token = StoredToken::new("access", Some("refresh".to_string()), Some(3600), now);

        assert_eq!(token.access_token, "access");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(
            token.expiry_date,
            Some((now + Duration::seconds(3600)).timestamp_millis())
        );
        assert!(!token.is_expired_at(now));
    }

    #[test]
    fn token_expiry_uses_skew() {
        let now = Utc::now();
        let token = StoredToken::new("access", None, Some(30), now);
        assert!(token.is_expired_at(now));

        let token = StoredToken::new("access", None, Some(3600), now);
        assert!(!token.is_expired_at(now));
        assert!(token.is_expired_at(now + Duration::hours(2)));
    }

    #[test]
    fn token_without_expiry_never_expires() {
        let token = StoredToken::new("access", None, None, Utc::now());
        assert!(token.expires_at().is_none());
        assert!(!token.is_expired());
    }

    #[test]
    fn refreshed_keeps_previous_refresh_token() {
        let now = Utc::now();
        let old = StoredToken::new("old", Some("refresh".to_string()), Some(10), now)
            .with_scope(Some("calendar".to_string()));
        let fresh = StoredToken::new("new", None, Some(3600), now);

        let merged = old.refreshed(fresh);
        assert_eq!(merged.access_token, "new");
        assert_eq!(merged.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(merged.scope.as_deref(), Some("calendar"));
    }

    #[test]
    fn parses_google_library_format() {
        let json = r#"{
            "access_token": "ya29.token",
            "refresh_token": "1//refresh",
            "scope": "https://www.googleapis.com/auth/calendar",
            "token_type": "Bearer",
            "expiry_date": 1718000000000
        }"#;

        let token: StoredToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "ya29.token");
        assert_eq!(token.expiry_date, Some(1_718_000_000_000));
        assert_eq!(
            token.expires_at().unwrap().to_rfc3339(),
            "2024-06-10T06:13:20+00:00"
        );
    }

    #[test]
    fn storage_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);
        let token = StoredToken::new("access", Some("refresh".to_string()), Some(3600), Utc::now());

        storage.save(&token).unwrap();
        assert!(storage.path().exists());
        assert!(!dir.path().join("token.json.tmp").exists());

        let loaded = TokenStorage::new(storage.path()).load().unwrap();
        assert_eq!(loaded, Some(token));
    }

    #[cfg(unix)]
    #[test]
    fn storage_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);
        storage
            .save(&StoredToken::new("access", None, None, Utc::now()))
            .unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn storage_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("nested").join("token.json"));
        storage
            .save(&StoredToken::new("access", None, None, Utc::now()))
            .unwrap();
        assert!(storage.path().exists());
    }

    #[test]
    fn storage_no_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(storage_in(&dir).load().unwrap().is_none());
    }

    #[test]
    fn storage_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);
        fs::write(storage.path(), "{ not json").unwrap();
        let err = storage.load().unwrap_err();
        assert!(err.message().contains("parse"));
    }
}
