//! Authorization callback route, mounted in callback auth mode.
//!
//! Google redirects the operator's browser to
//! `/oauth2/callback?code=...&state=...` (or `?error=...`); the result is
//! handed to the authorization waiting in [`CallbackCodeSource`] under the
//! same state. Callbacks without a state are refused.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use calproxy_providers::google::CallbackCodeSource;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::CALLBACK_PATH;

/// Query parameters sent by the authorization server.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code.
    pub code: Option<String>,
    /// Opaque state echoed back from the authorization request.
    pub state: Option<String>,
    /// Error reported instead of a code (e.g. `access_denied`).
    pub error: Option<String>,
}

/// Authorization callback routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create the callback route
    pub fn routes(source: Arc<CallbackCodeSource>) -> Router {
        Router::new()
            .route(CALLBACK_PATH, get(Self::handle_callback))
            .with_state(source)
    }

    async fn handle_callback(
        State(source): State<Arc<CallbackCodeSource>>,
        Query(params): Query<CallbackParams>,
    ) -> Response {
        let state = params.state.filter(|state| !state.is_empty());

        if let Some(error) = params.error {
            warn!(error = %error, "authorization callback reported an error");
            if let Some(state) = &state {
                source.deliver(state, Err(error));
            }
            return page(
                StatusCode::BAD_REQUEST,
                "Authorization failed",
                "The authorization server reported an error. You can close this window.",
            );
        }

        let Some(code) = params.code.filter(|code| !code.is_empty()) else {
            return page(
                StatusCode::BAD_REQUEST,
                "Authorization failed",
                "The callback did not include an authorization code.",
            );
        };

        let Some(state) = state else {
            warn!("authorization callback received without a state");
            return page(
                StatusCode::BAD_REQUEST,
                "Authorization failed",
                "The callback did not include a state.",
            );
        };

        if !source.deliver(&state, Ok(code)) {
            warn!(
                pending = source.pending_states().len(),
                "authorization callback matched no pending authorization"
            );
            return page(
                StatusCode::BAD_REQUEST,
                "Authorization failed",
                "No authorization is pending for this request.",
            );
        }

        info!("authorization code received");
        page(
            StatusCode::OK,
            "Authorization complete",
            "calproxy received the authorization code. You can close this window.",
        )
    }
}

fn page(status: StatusCode, title: &str, message: &str) -> Response {
    let body = format!(
        "<!DOCTYPE html>\n<html><head><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{message}</p></body></html>\n"
    );
    (status, Html(body)).into_response()
}
