//! Credential Manager: turns the persisted token into an authorized client.
//!
//! Resolution order for every request:
//!
//! 1. persisted token, not expired: bind it
//! 2. persisted token, expired, with a refresh token: refresh, persist, bind
//! 3. anything else (no file, unreadable file, refresh token rejected): run
//!    the interactive exchange through the configured [`AuthCodeSource`],
//!    persist the new token, bind it
//!
//! A refresh that fails for any other reason (token endpoint down or
//! answering 5xx) is returned to the caller; the operator is not prompted.
//!
//! Interactive exchanges are serialized. A request that waited for another
//! exchange re-reads the token file before prompting again.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{ProviderErrorCode, ProviderResult};

use super::client::CalendarClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::prompt::AuthCodeSource;
use super::tokens::{StoredToken, TokenStorage};

/// Resolves authorized calendar clients from the persisted token.
pub struct CredentialManager {
    config: GoogleConfig,
    storage: TokenStorage,
    oauth: OAuthClient,
    http_client: reqwest::Client,
    code_source: Arc<dyn AuthCodeSource>,
    exchange_lock: Mutex<()>,
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("token_path", &self.storage.path())
            .field("calendar_id", &self.config.calendar_id)
            .field("code_source", &self.code_source.name())
            .finish_non_exhaustive()
    }
}

impl CredentialManager {
    /// Creates a manager. Does not touch the token file.
    pub fn new(config: GoogleConfig, code_source: Arc<dyn AuthCodeSource>) -> ProviderResult<Self> {
        config.validate()?;

        let http_client = config.http_client()?;
        let storage = TokenStorage::new(&config.token_path);
        let oauth = OAuthClient::new(&config, http_client.clone());

        Ok(Self {
            config,
            storage,
            oauth,
            http_client,
            code_source,
            exchange_lock: Mutex::new(()),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Returns the token storage.
    pub fn storage(&self) -> &TokenStorage {
        &self.storage
    }

    /// Returns a client bound to a usable token, authorizing first if needed.
    pub async fn resolve_client(&self) -> ProviderResult<CalendarClient> {
        let token = self.authorize(false).await?;
        Ok(self.bind(token))
    }

    /// Returns a usable token, running the interactive exchange when the
    /// persisted one is missing or invalid, or unconditionally with `force`.
    pub async fn authorize(&self, force: bool) -> ProviderResult<StoredToken> {
        if !force && let Some(token) = self.usable_persisted_token().await? {
            return Ok(token);
        }

        let _guard = self.exchange_lock.lock().await;

        if !force && let Some(token) = self.usable_persisted_token().await? {
            debug!("token persisted by a concurrent exchange");
            return Ok(token);
        }

        self.interactive_exchange().await
    }

    /// Returns the persisted token, refreshed if needed.
    ///
    /// `Ok(None)` means the interactive exchange is required: no token, an
    /// unreadable token, or a refresh token the server rejected. Transient
    /// refresh failures are returned as errors.
    async fn usable_persisted_token(&self) -> ProviderResult<Option<StoredToken>> {
        let token = match self.storage.load() {
            Ok(Some(token)) => token,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(error = %e, path = %self.storage.path().display(), "persisted token unusable");
                return Ok(None);
            }
        };

        if !token.is_expired() {
            return Ok(Some(token));
        }

        let Some(refresh_token) = token.refresh_token.clone() else {
            info!("persisted token expired and has no refresh token");
            return Ok(None);
        };

        match self.oauth.refresh(&refresh_token).await {
            Ok(fresh) => {
                let token = token.refreshed(fresh);
                if let Err(e) = self.storage.save(&token) {
                    warn!(error = %e, "failed to persist refreshed token");
                }
                Ok(Some(token))
            }
            Err(e) if e.code() == ProviderErrorCode::AuthenticationFailed => {
                warn!(error = %e, "refresh token rejected");
                Ok(None)
            }
            Err(e) => {
                error!(error = %e, "token refresh failed");
                Err(e)
            }
        }
    }

    async fn interactive_exchange(&self) -> ProviderResult<StoredToken> {
        let request = self.oauth.start_authorization();
        info!(source = self.code_source.name(), "starting interactive authorization");

        let code = self
            .code_source
            .request_code(&request)
            .await
            .inspect_err(|e| error!(error = %e, "no authorization code obtained"))?;

        let token = self
            .oauth
            .exchange_code(&code, &request)
            .await
            .inspect_err(|e| error!(error = %e, "error retrieving access token"))?;

        self.storage.save(&token)?;
        Ok(token)
    }

    fn bind(&self, token: StoredToken) -> CalendarClient {
        CalendarClient::new(
            self.http_client.clone(),
            &self.config.api_base_url,
            &self.config.calendar_id,
            token.access_token,
        )
    }
}
