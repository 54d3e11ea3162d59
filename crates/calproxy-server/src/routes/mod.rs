//! HTTP routes.
//!
//! - [`EventRoutes`] - `/api/events` proxy to Google Calendar
//! - [`AuthRoutes`] - `/oauth2/callback`, callback auth mode only

mod auth;
mod events;

pub use auth::{AuthRoutes, CallbackParams};
pub use events::{DELETED_MESSAGE, EventRoutes, error_response};
