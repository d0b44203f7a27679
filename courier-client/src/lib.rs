//! Courier HTTP Client
//!
//! Transport between a runner and the task server.
//!
//! Every call is bound to a [`CancellationToken`]; callers impose per-call
//! deadlines by wrapping calls in `tokio::time::timeout`. Calls that must not be
//! lost (registration and status reports) go through a retry loop that keeps
//! trying on transient failures until it succeeds, hits a terminal error, or is
//! cancelled.
//!
//! # Example
//!
//! ```no_run
//! use courier_client::{StaticToken, TaskServerClient};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = TaskServerClient::new(
//!         "https://tasks.example.com",
//!         "account-1",
//!         StaticToken::new("secret"),
//!         false,
//!     )?;
//!
//!     let events = client
//!         .get_task_events("runner-1", &CancellationToken::new())
//!         .await?;
//!     println!("{} task(s) ready", events.events.len());
//!     Ok(())
//! }
//! ```

pub mod error;
mod runners;
mod tasks;
pub mod token;
mod transport;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use token::{CachedToken, StaticToken, TokenProvider};
pub use transport::TaskClient;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Fixed wait between attempts of a retried call
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// HTTP client for the task server API
///
/// Cloning is cheap: clones share the underlying connection pool.
#[derive(Clone)]
pub struct TaskServerClient {
    /// Base URL of the task server (e.g., "https://tasks.example.com")
    endpoint: String,
    /// Account the runner belongs to, sent as a query parameter
    account_id: String,
    /// HTTP client instance
    client: Client,
    /// Source of the authorization credential
    token: Arc<dyn TokenProvider>,
    /// Wait between attempts of a retried call
    retry_interval: Duration,
}

/// Status and fully drained body of a response
struct Reply {
    status: StatusCode,
    body: Vec<u8>,
}

impl TaskServerClient {
    /// Create a new task server client
    ///
    /// Redirects are never followed. When `skip_verify` is set, invalid TLS
    /// certificates are accepted.
    ///
    /// # Arguments
    /// * `endpoint` - Base URL of the task server
    /// * `account_id` - Account identifier
    /// * `token` - Credential provider used for every request
    /// * `skip_verify` - Accept invalid TLS certificates
    pub fn new(
        endpoint: impl Into<String>,
        account_id: impl Into<String>,
        token: impl TokenProvider + 'static,
        skip_verify: bool,
    ) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(skip_verify)
            .build()?;

        Ok(Self::with_client(endpoint, account_id, token, client))
    }

    /// Create a new task server client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        endpoint: impl Into<String>,
        account_id: impl Into<String>,
        token: impl TokenProvider + 'static,
        client: Client,
    ) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            account_id: account_id.into(),
            client,
            token: Arc::new(token),
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    /// Overrides the wait between attempts of retried calls
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Get the base URL of the task server
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the account this client acts for
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    // =============================================================================
    // Request Plumbing
    // =============================================================================

    /// Performs a single attempt
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&[u8]>,
        cancel: &CancellationToken,
    ) -> Result<Reply> {
        let reply = tokio::select! {
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            reply = self.send(method, path, body) => reply?,
        };

        check(reply)
    }

    /// Performs a call, retrying on transient failures
    ///
    /// Transport errors, 5xx responses and "no content" responses wait for
    /// the retry interval and try again. Any other response is final. The loop
    /// has no attempt limit; it ends when the cancellation token fires or the
    /// caller's deadline drops the future.
    async fn retry(
        &self,
        method: Method,
        path: &str,
        body: Option<&[u8]>,
        cancel: &CancellationToken,
    ) -> Result<Reply> {
        loop {
            if cancel.is_cancelled() {
                debug!("http: context canceled");
                return Err(ClientError::Cancelled);
            }

            let attempt = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("http: context canceled");
                    return Err(ClientError::Cancelled);
                }
                attempt = self.send(method.clone(), path, body) => attempt,
            };

            match attempt {
                Ok(reply) if reply.status.is_server_error() => {
                    debug!("http: server error {}: re-connect and re-try", reply.status);
                }
                Ok(reply) if reply.status == StatusCode::NO_CONTENT => {
                    debug!("http: no content returned: re-connect and re-try");
                }
                Ok(reply) => return check(reply),
                Err(ClientError::RequestFailed(e)) if !e.is_builder() => {
                    debug!("http: request error: {}", e);
                }
                Err(e) => return Err(e),
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("http: context canceled");
                    return Err(ClientError::Cancelled);
                }
                _ = tokio::time::sleep(self.retry_interval) => {}
            }
        }
    }

    /// Sends a signed request and drains the response body
    ///
    /// The body is always read to completion so the connection can go back
    /// to the pool.
    async fn send(&self, method: Method, path: &str, body: Option<&[u8]>) -> Result<Reply> {
        let url = format!("{}{}", self.endpoint, path);
        let token = self.token.token()?;

        let mut request = self
            .client
            .request(method, &url)
            .header(AUTHORIZATION, format!("Delegate {}", token))
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        Ok(Reply { status, body })
    }
}

/// Encodes a request body as JSON
fn encode<I: Serialize>(input: &I) -> Result<Vec<u8>> {
    serde_json::to_vec(input)
        .map_err(|e| ClientError::ParseError(format!("Failed to encode request: {}", e)))
}

/// Rejects failure responses
///
/// The error carries the response body, or the status text when the body is
/// empty.
fn check(reply: Reply) -> Result<Reply> {
    if reply.status.is_success() {
        return Ok(reply);
    }

    let message = if reply.body.is_empty() {
        reply
            .status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        String::from_utf8_lossy(&reply.body).into_owned()
    };
    Err(ClientError::api_error(reply.status.as_u16(), message))
}

/// Decodes the JSON body of a successful response
///
/// "No content" and empty bodies decode to `None`.
fn parse<O: DeserializeOwned>(reply: Reply) -> Result<Option<O>> {
    if reply.status == StatusCode::NO_CONTENT || reply.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(&reply.body)
        .map(Some)
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

impl std::fmt::Debug for TaskServerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskServerClient")
            .field("endpoint", &self.endpoint)
            .field("account_id", &self.account_id)
            .field("retry_interval", &self.retry_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> TaskServerClient {
        TaskServerClient::new(endpoint, "acc", StaticToken::new("secret"), false).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = client("http://localhost:8080");
        assert_eq!(client.endpoint(), "http://localhost:8080");
        assert_eq!(client.account_id(), "acc");
        assert_eq!(client.retry_interval, DEFAULT_RETRY_INTERVAL);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = client("http://localhost:8080/");
        assert_eq!(client.endpoint(), "http://localhost:8080");
    }

    #[test]
    fn test_client_with_custom_client() {
        let client = TaskServerClient::with_client(
            "http://localhost:8080",
            "acc",
            StaticToken::new("secret"),
            Client::new(),
        )
        .with_retry_interval(Duration::from_millis(5));
        assert_eq!(client.retry_interval, Duration::from_millis(5));
    }

    #[test]
    fn test_check_failure_uses_body_then_status_text() {
        let err = check(Reply {
            status: StatusCode::CONFLICT,
            body: b"task already acquired".to_vec(),
        })
        .err()
        .unwrap();
        assert!(matches!(err, ClientError::ApiError { status: 409, ref message } if message == "task already acquired"));

        let err = check(Reply {
            status: StatusCode::NOT_FOUND,
            body: Vec::new(),
        })
        .err()
        .unwrap();
        assert!(matches!(err, ClientError::ApiError { status: 404, ref message } if message == "Not Found"));
    }

    #[test]
    fn test_parse_empty_success() {
        let out = parse::<serde_json::Value>(Reply {
            status: StatusCode::OK,
            body: Vec::new(),
        })
        .unwrap();
        assert!(out.is_none());

        let out = parse::<serde_json::Value>(Reply {
            status: StatusCode::NO_CONTENT,
            body: Vec::new(),
        })
        .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_parse_bad_json() {
        let err = parse::<serde_json::Value>(Reply {
            status: StatusCode::OK,
            body: b"{not json".to_vec(),
        })
        .unwrap_err();
        assert!(matches!(err, ClientError::ParseError(_)));
    }
}
