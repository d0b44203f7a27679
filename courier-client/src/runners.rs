//! Runner-related API endpoints

use courier_core::dto::runner::{RegisterRequest, RegisterResponse};
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, Result};
use crate::{TaskServerClient, encode, parse};

impl TaskServerClient {
    // =============================================================================
    // Runner Registration & Lifecycle
    // =============================================================================

    /// Register a runner with the task server
    ///
    /// Transient failures are retried until `cancel` fires. A terminal
    /// rejection is returned as-is.
    ///
    /// # Arguments
    /// * `req` - Identity and capabilities of the runner
    /// * `cancel` - Stops the call, including any pending retry
    ///
    /// # Returns
    /// The server response carrying the assigned runner ID
    pub async fn register(
        &self,
        req: &RegisterRequest,
        cancel: &CancellationToken,
    ) -> Result<RegisterResponse> {
        let path = format!(
            "/api/agent/delegates/register?accountId={}",
            self.account_id
        );
        let body = encode(req)?;

        let reply = self.retry(Method::POST, &path, Some(&body), cancel).await?;
        let response: RegisterResponse = parse(reply)?.unwrap_or_default();

        if response.resource.delegate_id.is_empty() {
            return Err(ClientError::ParseError(
                "registration response carried no runner ID".to_string(),
            ));
        }

        Ok(response)
    }

    /// Send a heartbeat to the task server
    ///
    /// A single attempt; the next heartbeat tick is the retry.
    ///
    /// # Arguments
    /// * `req` - Registration info with a refreshed heartbeat timestamp
    /// * `cancel` - Stops the call
    pub async fn heartbeat(&self, req: &RegisterRequest, cancel: &CancellationToken) -> Result<()> {
        let path = format!(
            "/api/agent/delegates/heartbeat-with-polling?accountId={}",
            self.account_id
        );
        let body = encode(req)?;

        self.call(Method::POST, &path, Some(&body), cancel).await?;
        Ok(())
    }
}
