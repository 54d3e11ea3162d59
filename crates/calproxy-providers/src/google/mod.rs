//! Google Calendar backend.
//!
//! This module provides a [`CredentialManager`] that turns the token cached
//! on disk into an authorized [`CalendarClient`] for the Google Calendar API.
//!
//! # Authentication Flow
//!
//! 1. The operator provides an OAuth client ID/secret (`credentials.json`)
//! 2. A persisted token (`token.json`) is used as is while it is valid
//! 3. An expired token is refreshed with its refresh token
//! 4. Otherwise a consent URL is shown through an [`AuthCodeSource`], the
//!    operator hands back the authorization code, and the code is exchanged
//!    for tokens
//! 5. Tokens are persisted for future use
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use calproxy_providers::google::{
//!     ClientCredentials, ConsolePrompt, CredentialManager, GoogleConfig,
//! };
//!
//! let credentials = ClientCredentials::from_file("credentials.json")?;
//! let manager = CredentialManager::new(
//!     GoogleConfig::new(credentials),
//!     Arc::new(ConsolePrompt::new()),
//! )?;
//!
//! let events = manager.resolve_client().await?.list_upcoming(Utc::now()).await?;
//! ```

mod client;
mod config;
mod credentials;
mod manager;
mod oauth;
mod prompt;
mod tokens;

pub use client::{CalendarClient, LIST_MAX_RESULTS, RemoteResponse};
pub use config::{CALENDAR_API_BASE, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GoogleConfig};
pub use credentials::ClientCredentials;
pub use manager::CredentialManager;
pub use oauth::{AuthorizationRequest, OAuthClient, PkceFlow};
pub use prompt::{
    AuthCodeSource, BoxFuture, CallbackCodeSource, ConsolePrompt, extract_code, read_code,
};
pub use tokens::{StoredToken, TokenStorage};
