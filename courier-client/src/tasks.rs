//! Task-related API endpoints

use courier_core::domain::task::{Task, TaskResult};
use courier_core::dto::task::TaskEventsResponse;
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, Result};
use crate::{TaskServerClient, encode, parse};

impl TaskServerClient {
    // =============================================================================
    // Task Discovery
    // =============================================================================

    /// List task events waiting for this runner
    ///
    /// The server long-polls this endpoint; "no content" means nothing is
    /// ready and yields an empty response rather than an error.
    ///
    /// # Arguments
    /// * `runner_id` - The server-assigned runner ID
    /// * `cancel` - Stops the call
    pub async fn get_task_events(
        &self,
        runner_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TaskEventsResponse> {
        let path = format!(
            "/api/agent/delegates/{}/task-events?accountId={}",
            runner_id, self.account_id
        );

        let reply = self.call(Method::GET, &path, None, cancel).await?;
        Ok(parse(reply)?.unwrap_or_default())
    }

    // =============================================================================
    // Task Execution
    // =============================================================================

    /// Claim a task for execution by this runner
    ///
    /// The server may let the same runner acquire a task more than once, so
    /// callers must deduplicate locally.
    ///
    /// # Arguments
    /// * `runner_id` - The server-assigned runner ID
    /// * `task_id` - The task to claim
    /// * `cancel` - Stops the call
    ///
    /// # Returns
    /// The full task
    pub async fn acquire(
        &self,
        runner_id: &str,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Task> {
        let path = format!(
            "/api/agent/v2/delegates/{}/tasks/{}/acquire?accountId={}&delegateInstanceId={}",
            runner_id, task_id, self.account_id, runner_id
        );

        let reply = self.call(Method::PUT, &path, None, cancel).await?;
        parse(reply)?.ok_or(ClientError::NoContent)
    }

    /// Report the outcome of a task
    ///
    /// Retried until it succeeds, fails terminally or `cancel` fires: a
    /// lost result is worse than a duplicate report.
    ///
    /// # Arguments
    /// * `runner_id` - The server-assigned runner ID
    /// * `task_id` - The task being reported
    /// * `result` - The execution result
    /// * `cancel` - Stops the call, including any pending retry
    pub async fn send_status(
        &self,
        runner_id: &str,
        task_id: &str,
        result: &TaskResult,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let path = format!(
            "/api/agent/v2/tasks/{}/delegates/{}?accountId={}",
            task_id, runner_id, self.account_id
        );
        let body = encode(result)?;

        self.retry(Method::POST, &path, Some(&body), cancel).await?;
        Ok(())
    }
}
