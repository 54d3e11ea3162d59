//! Event routes: the five calendar operations under `/api/events`.
//!
//! Each handler resolves one authorized client, issues exactly one remote
//! call and maps the outcome:
//!
//! - success: the remote status with the documented body
//! - remote failure: the remote error code with its first error detail
//! - anything else: `{"message": ...}` with 401, 502 or 500

use std::future::Future;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use calproxy_providers::{ProviderError, ProviderErrorCode, ProviderResult};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use crate::state::SharedState;

/// Body returned by a successful delete.
pub const DELETED_MESSAGE: &str = "Event has been deleted.";

/// Event routes handler
pub struct EventRoutes;

impl EventRoutes {
    /// Create all event routes
    pub fn routes(state: SharedState) -> Router {
        Router::new()
            .route(
                "/api/events",
                get(Self::handle_list).post(Self::handle_create),
            )
            .route(
                "/api/events/{id}",
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .with_state(state)
    }

    /// `GET /api/events`: upcoming events, `items` only.
    async fn handle_list(State(state): State<SharedState>) -> Response {
        Self::proxy("list", None, async {
            let response = state
                .credentials
                .resolve_client()
                .await?
                .list_upcoming(Utc::now())
                .await?;
            Ok((response.status, response.items()))
        })
        .await
    }

    /// `POST /api/events`: create from the request body.
    async fn handle_create(State(state): State<SharedState>, Json(event): Json<Value>) -> Response {
        Self::proxy("insert", None, async {
            let response = state.credentials.resolve_client().await?.insert(&event).await?;
            Ok((response.status, response.body))
        })
        .await
    }

    /// `GET /api/events/{id}`
    async fn handle_get(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
        Self::proxy("get", Some(&id), async {
            let response = state.credentials.resolve_client().await?.get(&id).await?;
            Ok((response.status, response.body))
        })
        .await
    }

    /// `PUT /api/events/{id}`: replace from the request body.
    async fn handle_update(
        State(state): State<SharedState>,
        Path(id): Path<String>,
        Json(event): Json<Value>,
    ) -> Response {
        Self::proxy("update", Some(&id), async {
            let response = state
                .credentials
                .resolve_client()
                .await?
                .update(&id, &event)
                .await?;
            Ok((response.status, response.body))
        })
        .await
    }

    /// `DELETE /api/events/{id}`: the remote body is replaced by a fixed message.
    async fn handle_delete(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
        Self::proxy("delete", Some(&id), async {
            let response = state.credentials.resolve_client().await?.delete(&id).await?;
            Ok((response.status, json!({ "message": DELETED_MESSAGE })))
        })
        .await
    }

    async fn proxy<F>(operation: &'static str, event_id: Option<&str>, call: F) -> Response
    where
        F: Future<Output = ProviderResult<(u16, Value)>>,
    {
        match call.await {
            Ok((status, body)) => {
                debug!(operation, event_id, status, "calendar operation succeeded");
                json_response(status, body)
            }
            Err(e) => {
                if e.code() == ProviderErrorCode::RemoteApiError {
                    warn!(operation, event_id, error = %e, "calendar operation failed");
                } else {
                    error!(operation, event_id, error = %e, "calendar operation failed");
                }
                error_response(&e)
            }
        }
    }
}

/// Maps a provider error to an HTTP response.
pub fn error_response(err: &ProviderError) -> Response {
    if let Some(remote) = err.remote_error() {
        return json_response(remote.code, remote.first_detail());
    }

    let status = match err.code() {
        ProviderErrorCode::AuthenticationFailed => StatusCode::UNAUTHORIZED,
        ProviderErrorCode::NetworkError
        | ProviderErrorCode::InvalidResponse
        | ProviderErrorCode::RemoteApiError => StatusCode::BAD_GATEWAY,
        ProviderErrorCode::ConfigurationError | ProviderErrorCode::InternalError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(json!({ "message": err.message() }))).into_response()
}

fn json_response(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use calproxy_providers::RemoteError;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn remote_error_uses_code_and_first_detail() {
        let remote = RemoteError::from_response(
            404,
            r#"{"error":{"code":404,"message":"Not Found","errors":[{"reason":"notFound","message":"Not Found"},{"reason":"other"}]}}"#,
        );
        let response = error_response(&ProviderError::remote(remote));

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"reason": "notFound", "message": "Not Found"})
        );
    }

    #[tokio::test]
    async fn authentication_failure_is_unauthorized() {
        let response = error_response(&ProviderError::authentication("no code entered"));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"message": "no code entered"}));
    }

    #[test]
    fn transport_failures_are_bad_gateway() {
        assert_eq!(
            error_response(&ProviderError::network("connection refused")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_response(&ProviderError::invalid_response("bad json")).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn internal_failures_are_server_errors() {
        assert_eq!(
            error_response(&ProviderError::internal("stdin closed")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_response(&ProviderError::configuration("bad url")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn out_of_range_status_is_bad_gateway() {
        assert_eq!(json_response(1000, Value::Null).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_response(201, Value::Null).status(), StatusCode::CREATED);
    }
}
