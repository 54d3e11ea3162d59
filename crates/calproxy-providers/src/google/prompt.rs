//! Channels through which an operator supplies the authorization code.
//!
//! - [`ConsolePrompt`] prints the consent URL and reads the code from stdin.
//! - [`CallbackCodeSource`] waits for the code to be delivered by an HTTP
//!   callback endpoint, usually the redirect target registered with Google.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::oauth::AuthorizationRequest;

/// A boxed future type for trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Presents a consent URL to an operator and returns the code they obtained.
pub trait AuthCodeSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Presents `request.url` and waits for the authorization code.
    ///
    /// There is no timeout: the future stays pending until the operator acts.
    fn request_code<'a>(
        &'a self,
        request: &'a AuthorizationRequest,
    ) -> BoxFuture<'a, ProviderResult<String>>;
}

/// Pulls the authorization code out of operator input.
///
/// Accepts either the bare code or the whole redirect URL the browser landed
/// on (`http://localhost/?code=...&scope=...`).
pub fn extract_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(url) = url::Url::parse(input)
        && url.has_host()
    {
        return url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .filter(|code| !code.is_empty());
    }

    Some(input.to_string())
}

/// Reads one line of operator input and extracts the code from it.
pub async fn read_code<R>(reader: &mut R) -> ProviderResult<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .map_err(|e| ProviderError::internal(format!("failed to read authorization code: {}", e)))?;

    if read == 0 {
        return Err(ProviderError::authentication(
            "input closed before an authorization code was entered",
        ));
    }

    extract_code(&line)
        .ok_or_else(|| ProviderError::authentication("no authorization code entered"))
}

type OperatorInput = Box<dyn AsyncBufRead + Send + Unpin>;

/// Prompts on the terminal: URL on stderr, code from stdin.
///
/// All prompts read through one buffered stdin handle. A prompt whose request
/// was abandoned leaves its pending read on that handle, so the line the
/// operator types next goes to the next prompt instead of being lost.
#[derive(Clone)]
pub struct ConsolePrompt {
    open_browser: bool,
    input: Arc<AsyncMutex<OperatorInput>>,
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConsolePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsolePrompt")
            .field("open_browser", &self.open_browser)
            .finish_non_exhaustive()
    }
}

impl ConsolePrompt {
    /// Creates a console prompt reading from stdin.
    pub fn new() -> Self {
        Self::with_input(BufReader::new(tokio::io::stdin()))
    }

    /// Creates a console prompt reading codes from `input`.
    pub fn with_input(input: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        Self {
            open_browser: false,
            input: Arc::new(AsyncMutex::new(Box::new(input))),
        }
    }

    /// Also try to open the consent URL in the default browser.
    pub fn with_open_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }
}

impl AuthCodeSource for ConsolePrompt {
    fn name(&self) -> &str {
        "console"
    }

    fn request_code<'a>(
        &'a self,
        request: &'a AuthorizationRequest,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            if self.open_browser
                && let Err(e) = open::that(&request.url)
            {
                warn!("failed to open browser: {}", e);
            }

            eprintln!("\nAuthorize this app by visiting this url:\n\n{}\n", request.url);
            eprintln!("Enter the code from that page here:");

            let mut input = self.input.lock().await;
            read_code(&mut *input).await
        })
    }
}

type CodeSender = oneshot::Sender<ProviderResult<String>>;

/// Waits for the code to arrive through [`CallbackCodeSource::deliver`].
///
/// Pending requests are keyed by their OAuth `state`; a callback must echo
/// the state of the request it completes.
#[derive(Debug, Default)]
pub struct CallbackCodeSource {
    pending: Mutex<HashMap<String, CodeSender>>,
}

impl CallbackCodeSource {
    /// Creates a callback source with no pending requests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the states of the authorizations waiting for a code.
    pub fn pending_states(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(_, tx)| !tx.is_closed())
            .map(|(state, _)| state.clone())
            .collect()
    }

    /// Hands a callback result to the authorization issued with `state`.
    ///
    /// Returns false when no live authorization matches.
    pub fn deliver(&self, state: &str, result: Result<String, String>) -> bool {
        let Some(tx) = self.lock().remove(state) else {
            return false;
        };

        let outcome = result.map_err(|reason| {
            ProviderError::authentication(format!("authorization denied: {}", reason))
        });
        let delivered = tx.send(outcome).is_ok();
        debug!(delivered, "delivered authorization callback");
        delivered
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CodeSender>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuthCodeSource for CallbackCodeSource {
    fn name(&self) -> &str {
        "callback"
    }

    fn request_code<'a>(
        &'a self,
        request: &'a AuthorizationRequest,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();
            {
                let mut pending = self.lock();
                pending.retain(|_, tx| !tx.is_closed());
                pending.insert(request.pkce.state.clone(), tx);
            }

            info!(url = %request.url, "authorization required, waiting for callback");
            eprintln!("\nAuthorize this app by visiting this url:\n\n{}\n", request.url);

            rx.await.map_err(|_| {
                ProviderError::internal("authorization callback channel closed")
            })?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::google::oauth::PkceFlow;

    fn request_with_state(state: &str) -> AuthorizationRequest {
        let mut pkce = PkceFlow::new();
        pkce.state = state.to_string();
        AuthorizationRequest {
            url: "https://accounts.example.com/auth".to_string(),
            redirect_uri: "http://localhost".to_string(),
            pkce,
        }
    }

    #[test]
    fn extract_bare_code() {
        assert_eq!(extract_code("  4/0AbCdEf\n"), Some("4/0AbCdEf".to_string()));
    }

    #[test]
    fn extract_code_from_redirect_url() {
        let input = "http://localhost/?code=4%2F0AbCdEf&scope=https://www.googleapis.com/auth/calendar";
        assert_eq!(extract_code(input), Some("4/0AbCdEf".to_string()));
    }

    #[test]
    fn extract_code_from_url_without_code() {
        assert_eq!(extract_code("http://localhost/?error=access_denied"), None);
    }

    #[test]
    fn extract_empty_input() {
        assert_eq!(extract_code("   \n"), None);
    }

    #[tokio::test]
    async fn read_code_from_line() {
        let mut input: &[u8] = b"the-code\nignored\n";
        assert_eq!(read_code(&mut input).await.unwrap(), "the-code");
    }

    #[tokio::test]
    async fn read_code_eof() {
        let mut input: &[u8] = b"";
        let err = read_code(&mut input).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
    }

    #[tokio::test]
    async fn read_code_blank_line() {
        let mut input: &[u8] = b"\n";
        assert!(read_code(&mut input).await.is_err());
    }

    #[tokio::test]
    async fn callback_delivers_matching_state() {
        let source = std::sync::Arc::new(CallbackCodeSource::new());
        let request = request_with_state("state-1");

        let waiter = {
            let source = source.clone();
            tokio::spawn(async move { source.request_code(&request).await })
        };

        while source.pending_states().is_empty() {
            tokio::task::yield_now().await;
        }

        assert_eq!(source.pending_states(), vec!["state-1".to_string()]);
        assert!(!source.deliver("other", Ok("wrong".to_string())));
        assert!(source.deliver("state-1", Ok("right".to_string())));
        assert_eq!(waiter.await.unwrap().unwrap(), "right");
        assert!(source.pending_states().is_empty());
    }

    #[tokio::test]
    async fn callback_error_is_authentication_failure() {
        let source = std::sync::Arc::new(CallbackCodeSource::new());
        let request = request_with_state("state-2");

        let waiter = {
            let source = source.clone();
            tokio::spawn(async move { source.request_code(&request).await })
        };

        while source.pending_states().is_empty() {
            tokio::task::yield_now().await;
        }

        assert!(source.deliver("state-2", Err("access_denied".to_string())));
        let err = waiter.await.unwrap().unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.message().contains("access_denied"));
    }

    #[test]
    fn deliver_without_waiters() {
        let source = CallbackCodeSource::new();
        assert!(!source.deliver("unknown", Ok("code".to_string())));
    }

    #[tokio::test]
    async fn mismatched_state_leaves_request_pending() {
        let source = std::sync::Arc::new(CallbackCodeSource::new());
        let first = request_with_state("state-a");
        let second = request_with_state("state-b");

        let waiters = {
            let (a, b) = (source.clone(), source.clone());
            (
                tokio::spawn(async move { a.request_code(&first).await }),
                tokio::spawn(async move { b.request_code(&second).await }),
            )
        };

        while source.pending_states().len() < 2 {
            tokio::task::yield_now().await;
        }

        assert!(source.deliver("state-b", Ok("code-b".to_string())));
        assert_eq!(waiters.1.await.unwrap().unwrap(), "code-b");
        assert_eq!(source.pending_states(), vec!["state-a".to_string()]);

        assert!(source.deliver("state-a", Ok("code-a".to_string())));
        assert_eq!(waiters.0.await.unwrap().unwrap(), "code-a");
    }

    #[tokio::test]
    async fn abandoned_console_prompt_keeps_next_line() {
        let (reader, mut writer) = tokio::io::duplex(64);
        let prompt = ConsolePrompt::with_input(BufReader::new(reader));
        let request = request_with_state("console");

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            prompt.request_code(&request),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::io::AsyncWriteExt::write_all(&mut writer, b"later-code\n")
            .await
            .unwrap();
        assert_eq!(prompt.request_code(&request).await.unwrap(), "later-code");
    }
}
