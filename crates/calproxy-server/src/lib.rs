//! HTTP proxy exposing Google Calendar events as a small REST API.
//!
//! This crate provides the calproxy server:
//! - `GET/POST /api/events` and `GET/PUT/DELETE /api/events/{id}`, each a
//!   pass-through to the Google Calendar API
//! - OAuth2 token handling via [`calproxy_providers::google::CredentialManager`]
//! - `GET /oauth2/callback` in callback auth mode
//!
//! # Example
//!
//! ```rust,no_run
//! use calproxy_server::{AppState, ServerConfig, server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let state = AppState::from_config(&config)?;
//!     server::run(&config, state).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod signals;
pub mod state;

pub use config::{AuthMode, CALLBACK_PATH, DEFAULT_PORT, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::build_router;
pub use state::{AppState, SharedState};
