//! One-off commands run instead of the server.

use std::sync::Arc;

use calproxy_providers::google::{ConsolePrompt, CredentialManager};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Runs the authorization flow on the terminal and persists the token.
///
/// Without `force`, a usable saved token (refreshed if expired) is kept.
pub async fn auth(config: &ServerConfig, force: bool) -> ServerResult<()> {
    let google = config.load_google_config()?;
    let prompt = ConsolePrompt::new().with_open_browser(config.open_browser);
    let manager = CredentialManager::new(google, Arc::new(prompt))?;

    let token = manager.authorize(force).await?;

    info!(path = %manager.storage().path().display(), "Google authorization successful");
    println!("Authorization successful.");
    println!("Token saved to {}", manager.storage().path().display());
    if let Some(expires_at) = token.expires_at() {
        println!("Access token valid until {}", expires_at.to_rfc3339());
    }

    Ok(())
}
