//! Shared application state.

use std::sync::Arc;

use calproxy_providers::google::{
    AuthCodeSource, CallbackCodeSource, ConsolePrompt, CredentialManager, GoogleConfig,
};

use crate::config::{AuthMode, ServerConfig};
use crate::error::ServerResult;

/// State shared by every request handler.
#[derive(Debug)]
pub struct AppState {
    /// Resolves authorized calendar clients.
    pub credentials: CredentialManager,
    /// Set in callback auth mode; receives codes from the callback route.
    pub callback: Option<Arc<CallbackCodeSource>>,
}

/// Shared state handle passed to axum.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Builds the state for `config`, reading the credentials file.
    pub fn from_config(config: &ServerConfig) -> ServerResult<SharedState> {
        let google = config.load_google_config()?;
        Self::with_google_config(config, google)
    }

    /// Builds the state around an already loaded provider configuration.
    pub fn with_google_config(
        config: &ServerConfig,
        google: GoogleConfig,
    ) -> ServerResult<SharedState> {
        let callback = match config.auth_mode {
            AuthMode::Console => None,
            AuthMode::Callback => Some(Arc::new(CallbackCodeSource::new())),
        };

        let source: Arc<dyn AuthCodeSource> = match &callback {
            Some(callback) => callback.clone(),
            None => Arc::new(ConsolePrompt::new().with_open_browser(config.open_browser)),
        };

        Ok(Self::new(CredentialManager::new(google, source)?, callback))
    }

    /// Wraps an existing credential manager.
    pub fn new(
        credentials: CredentialManager,
        callback: Option<Arc<CallbackCodeSource>>,
    ) -> SharedState {
        Arc::new(Self {
            credentials,
            callback,
        })
    }
}
