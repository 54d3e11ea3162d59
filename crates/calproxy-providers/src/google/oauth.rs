//! OAuth 2.0 authorization code flow for Google APIs.
//!
//! The flow is split so that the code can arrive through any channel:
//!
//! 1. [`OAuthClient::start_authorization`] builds the consent URL with a PKCE
//!    challenge and a random state
//! 2. an [`AuthCodeSource`](super::prompt::AuthCodeSource) shows the URL to an
//!    operator and hands back the authorization code
//! 3. [`OAuthClient::exchange_code`] trades the code (with the PKCE verifier)
//!    for an access token and a refresh token
//!
//! [`OAuthClient::refresh`] renews an expired access token.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::config::GoogleConfig;
use super::credentials::ClientCredentials;
use super::tokens::StoredToken;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// OAuth client for Google's authorization and token endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: ClientCredentials,
    scopes: Vec<String>,
    auth_url: String,
    token_url: String,
    http_client: reqwest::Client,
}

/// A pending authorization: the consent URL and what is needed to redeem its code.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// The URL the operator has to visit.
    pub url: String,
    /// Redirect target registered for this request.
    pub redirect_uri: String,
    /// PKCE verifier and state.
    pub pkce: PkceFlow,
}

impl OAuthClient {
    /// Creates an OAuth client from the provider configuration.
    pub fn new(config: &GoogleConfig, http_client: reqwest::Client) -> Self {
        Self {
            credentials: config.credentials.clone(),
            scopes: config.scopes.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            http_client,
        }
    }

    /// Starts a new authorization and returns the consent URL to present.
    pub fn start_authorization(&self) -> AuthorizationRequest {
        let pkce = PkceFlow::new();
        let redirect_uri = self.credentials.redirect_uri().to_string();
        let url = pkce.build_auth_url(
            &self.auth_url,
            &self.credentials.client_id,
            &redirect_uri,
            &self.scopes,
        );

        debug!(url = %url, "built authorization URL");
        AuthorizationRequest {
            url,
            redirect_uri,
            pkce,
        }
    }

    /// Exchanges an authorization code for a token.
    pub async fn exchange_code(
        &self,
        code: &str,
        request: &AuthorizationRequest,
    ) -> ProviderResult<StoredToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", request.pkce.verifier.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", request.redirect_uri.as_str()),
        ];

        let response = self.post_token_endpoint(&params, "token exchange").await?;
        info!("obtained token from authorization code");

        let scope = response
            .scope
            .clone()
            .or_else(|| Some(self.scopes.join(" ")));
        Ok(response.into_token().with_scope(scope))
    }

    /// Refreshes an access token.
    ///
    /// The returned token carries no refresh token unless Google rotated it;
    /// merge it with [`StoredToken::refreshed`].
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<StoredToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token_endpoint(&params, "token refresh").await?;
        info!("refreshed access token");
        let scope = response.scope.clone();
        Ok(response.into_token().with_scope(scope))
    }

    async fn post_token_endpoint(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = format!("{} failed ({}): {}", what, status, body);
            // Rejected grants come back as 400/401; other statuses are outages.
            return Err(match status.as_u16() {
                400 | 401 => ProviderError::authentication(message),
                _ => ProviderError::network(message),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
    }
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug, Clone)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = Self::generate_verifier();
        let challenge = Self::compute_challenge(&verifier);
        let state = Self::generate_state();

        Self {
            verifier,
            challenge,
            state,
        }
    }

    fn generate_verifier() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..CODE_VERIFIER_LENGTH).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    fn generate_state() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Builds the consent URL requesting offline access.
    pub fn build_auth_url(
        &self,
        auth_url: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?access_type=offline&scope={}&response_type=code&client_id={}&\
            redirect_uri={}&code_challenge={}&code_challenge_method=S256&state={}",
            auth_url,
            urlencoding::encode(&scope),
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> StoredToken {
        let mut token = StoredToken::new(
            self.access_token,
            self.refresh_token,
            self.expires_in,
            Utc::now(),
        );
        if self.token_type.is_some() {
            token.token_type = self.token_type;
        }
        token
    }
}
