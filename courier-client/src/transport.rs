//! Transport seam consumed by the runner
//!
//! The runner only depends on [`TaskClient`], so its scheduling logic can be
//! exercised against an in-memory double.

use async_trait::async_trait;
use courier_core::domain::task::{Task, TaskResult};
use courier_core::dto::runner::{RegisterRequest, RegisterResponse};
use courier_core::dto::task::TaskEventsResponse;
use tokio_util::sync::CancellationToken;

use crate::TaskServerClient;
use crate::error::Result;

/// Operations a runner performs against a task server
#[async_trait]
pub trait TaskClient: Send + Sync {
    /// Registers the runner; transient failures are retried until cancelled
    async fn register(
        &self,
        req: &RegisterRequest,
        cancel: &CancellationToken,
    ) -> Result<RegisterResponse>;

    /// Pings the server to keep the runner alive
    async fn heartbeat(&self, req: &RegisterRequest, cancel: &CancellationToken) -> Result<()>;

    /// Lists task events ready for this runner; may be empty
    async fn get_task_events(
        &self,
        runner_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TaskEventsResponse>;

    /// Claims a task for this runner
    async fn acquire(&self, runner_id: &str, task_id: &str, cancel: &CancellationToken)
    -> Result<Task>;

    /// Reports a task outcome; transient failures are retried until cancelled
    async fn send_status(
        &self,
        runner_id: &str,
        task_id: &str,
        result: &TaskResult,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

#[async_trait]
impl TaskClient for TaskServerClient {
    async fn register(
        &self,
        req: &RegisterRequest,
        cancel: &CancellationToken,
    ) -> Result<RegisterResponse> {
        TaskServerClient::register(self, req, cancel).await
    }

    async fn heartbeat(&self, req: &RegisterRequest, cancel: &CancellationToken) -> Result<()> {
        TaskServerClient::heartbeat(self, req, cancel).await
    }

    async fn get_task_events(
        &self,
        runner_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TaskEventsResponse> {
        TaskServerClient::get_task_events(self, runner_id, cancel).await
    }

    async fn acquire(
        &self,
        runner_id: &str,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Task> {
        TaskServerClient::acquire(self, runner_id, task_id, cancel).await
    }

    async fn send_status(
        &self,
        runner_id: &str,
        task_id: &str,
        result: &TaskResult,
        cancel: &CancellationToken,
    ) -> Result<()> {
        TaskServerClient::send_status(self, runner_id, task_id, result, cancel).await
    }
}
