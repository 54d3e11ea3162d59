//! Error types for credential and calendar operations.

use std::fmt;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Authorization code could not be obtained or exchanged, or a token was rejected.
    AuthenticationFailed,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// The remote API answered with an error status.
    RemoteApiError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Configuration error - missing or invalid credentials or paths.
    ConfigurationError,
    /// Internal error - unexpected state, bug.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::NetworkError => "network_error",
            Self::RemoteApiError => "remote_api_error",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error returned by the remote calendar API.
///
/// Mirrors the `error` object of Google's JSON error envelope:
///
/// ```json
/// {"error": {"code": 404, "message": "Not Found",
///            "errors": [{"domain": "global", "reason": "notFound", "message": "Not Found"}]}}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteError {
    /// Error code, equal to the HTTP status of the failed call.
    #[serde(default)]
    pub code: u16,
    /// Top-level message.
    #[serde(default)]
    pub message: String,
    /// Structured error details.
    #[serde(default)]
    pub errors: Vec<Value>,
}

#[derive(Deserialize)]
struct RemoteErrorEnvelope {
    error: RemoteError,
}

impl RemoteError {
    /// Builds a remote error from a failed response's status and body.
    ///
    /// Bodies that are not a Google error envelope keep the raw text as
    /// the message and carry no details.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<RemoteErrorEnvelope>(body) {
            Ok(RemoteErrorEnvelope { mut error }) => {
                if error.code == 0 {
                    error.code = status;
                }
                error
            }
            Err(_) => Self {
                code: status,
                message: body.trim().to_string(),
                errors: Vec::new(),
            },
        }
    }

    /// Returns the first structured error detail.
    ///
    /// Falls back to `{"message": <message>}` when the remote sent none.
    pub fn first_detail(&self) -> Value {
        match self.errors.first() {
            Some(detail) => detail.clone(),
            None => json!({ "message": self.message }),
        }
    }
}

/// An error that occurred while resolving credentials or calling the calendar API.
#[derive(Debug, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The remote API error, for [`ProviderErrorCode::RemoteApiError`].
    remote: Option<RemoteError>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            remote: None,
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates an error carrying the remote API's own error.
    pub fn remote(remote: RemoteError) -> Self {
        let message = format!("calendar API error ({}): {}", remote.code, remote.message);
        Self {
            code: ProviderErrorCode::RemoteApiError,
            message,
            remote: Some(remote),
            source: None,
        }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the remote API error, if this error came from the calendar API.
    pub fn remote_error(&self) -> Option<&RemoteError> {
        self.remote.as_ref()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_display() {
        assert_eq!(
            ProviderErrorCode::AuthenticationFailed.as_str(),
            "authentication_failed"
        );
        assert_eq!(ProviderErrorCode::RemoteApiError.to_string(), "remote_api_error");
    }

    #[test]
    fn provider_error_creation() {
        let err = ProviderError::authentication("code exchange failed");
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.message(), "code exchange failed");
        assert!(err.remote_error().is_none());
    }

    #[test]
    fn provider_error_display() {
        let err = ProviderError::network("connection refused");
        let display = format!("{}", err);
        assert!(display.contains("network_error"));
        assert!(display.contains("connection refused"));
    }

    #[test]
    fn provider_error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = ProviderError::internal("failed to persist token").with_source(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn remote_error_from_google_envelope() {
        let body = r#"{
            "error": {
                "code": 404,
                "message": "Not Found",
                "errors": [
                    {"domain": "global", "reason": "notFound", "message": "Not Found"}
                ]
            }
        }"#;

        let remote = RemoteError::from_response(404, body);
        assert_eq!(remote.code, 404);
        assert_eq!(remote.message, "Not Found");
        assert_eq!(
            remote.first_detail(),
            json!({"domain": "global", "reason": "notFound", "message": "Not Found"})
        );
    }

    #[test]
    fn remote_error_takes_status_when_code_missing() {
        let body = r#"{"error": {"message": "Backend Error", "errors": []}}"#;
        let remote = RemoteError::from_response(503, body);
        assert_eq!(remote.code, 503);
        assert_eq!(remote.first_detail(), json!({"message": "Backend Error"}));
    }

    #[test]
    fn remote_error_from_plain_body() {
        let remote = RemoteError::from_response(502, "Bad Gateway\n");
        assert_eq!(remote.code, 502);
        assert!(remote.errors.is_empty());
        assert_eq!(remote.first_detail(), json!({"message": "Bad Gateway"}));
    }

    #[test]
    fn remote_provider_error_keeps_payload() {
        let err = ProviderError::remote(RemoteError::from_response(
            410,
            r#"{"error": {"code": 410, "message": "Resource has been deleted", "errors": [{"reason": "deleted"}]}}"#,
        ));
        assert_eq!(err.code(), ProviderErrorCode::RemoteApiError);
        let remote = err.remote_error().unwrap();
        assert_eq!(remote.code, 410);
        assert_eq!(remote.first_detail(), json!({"reason": "deleted"}));
        assert!(err.to_string().contains("410"));
    }
}
