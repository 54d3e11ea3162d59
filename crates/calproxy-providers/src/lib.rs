//! Google Calendar access for calproxy.
//!
//! - [`google::CredentialManager`] - resolves an authorized client from the
//!   cached OAuth token, refreshing or re-authorizing when needed
//! - [`google::CalendarClient`] - the five event operations against the
//!   Google Calendar API
//! - [`ProviderError`] - error types, including the remote error envelope

pub mod error;
pub mod google;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult, RemoteError};
