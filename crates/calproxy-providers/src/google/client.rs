//! Google Calendar API client.
//!
//! A [`CalendarClient`] is the authorized handle returned by the
//! [`CredentialManager`](super::CredentialManager). Every call consumes the
//! handle, so one handle issues exactly one remote call.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult, RemoteError};

/// Number of upcoming events requested by [`CalendarClient::list_upcoming`].
pub const LIST_MAX_RESULTS: u32 = 10;

/// A successful remote response: status and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    /// HTTP status returned by the calendar API.
    pub status: u16,
    /// Parsed body; `Value::Null` when the API sent none.
    pub body: Value,
}

impl RemoteResponse {
    /// Returns the `items` array of a list response, or an empty array.
    pub fn items(&self) -> Value {
        match self.body.get("items") {
            Some(items @ Value::Array(_)) => items.clone(),
            _ => Value::Array(Vec::new()),
        }
    }
}

/// Authorized Google Calendar client bound to one access token.
#[derive(Debug)]
pub struct CalendarClient {
    http_client: reqwest::Client,
    base_url: String,
    calendar_id: String,
    access_token: String,
}

impl CalendarClient {
    /// Creates a client bound to `access_token`.
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        calendar_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            calendar_id: calendar_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Returns the bound access token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the calendar this client acts on.
    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Lists upcoming events starting at `now`.
    ///
    /// Recurring events are expanded to single instances and ordered by start
    /// time; at most [`LIST_MAX_RESULTS`] are returned.
    pub async fn list_upcoming(self, now: DateTime<Utc>) -> ProviderResult<RemoteResponse> {
        let request = self
            .http_client
            .get(self.events_url())
            .query(&[
                ("timeMin", now.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ("maxResults", LIST_MAX_RESULTS.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ]);
        self.send(request, "list").await
    }

    /// Inserts a new event.
    pub async fn insert(self, event: &Value) -> ProviderResult<RemoteResponse> {
        let request = self.http_client.post(self.events_url()).json(event);
        self.send(request, "insert").await
    }

    /// Fetches one event.
    pub async fn get(self, event_id: &str) -> ProviderResult<RemoteResponse> {
        let request = self.http_client.get(self.event_url(event_id));
        self.send(request, "get").await
    }

    /// Replaces one event.
    pub async fn update(self, event_id: &str, event: &Value) -> ProviderResult<RemoteResponse> {
        let request = self.http_client.put(self.event_url(event_id)).json(event);
        self.send(request, "update").await
    }

    /// Deletes one event.
    pub async fn delete(self, event_id: &str) -> ProviderResult<RemoteResponse> {
        let request = self.http_client.delete(self.event_url(event_id));
        self.send(request, "delete").await
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    async fn send(
        self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> ProviderResult<RemoteResponse> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("request timeout")
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e))
                } else {
                    ProviderError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        debug!(operation, status, calendar = %self.calendar_id, "calendar API responded");

        if !(200..300).contains(&status) {
            return Err(ProviderError::remote(RemoteError::from_response(status, &body)));
        }

        let body = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!("failed to parse response: {}", e))
            })?
        };

        Ok(RemoteResponse { status, body })
    }
}
