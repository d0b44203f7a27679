//! Heartbeat loop
//!
//! Keeps the runner marked alive on the task server. Failures are logged and
//! the next tick tries again; the loop only ends on cancellation.

use courier_client::TaskClient;
use courier_core::dto::runner::RegisterRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::bounded;

/// Registration info plus the time of the last heartbeat
///
/// Owned by the heartbeat loop; nothing else mutates it.
#[derive(Debug, Clone)]
pub struct HeartbeatState {
    info: RegisterRequest,
}

impl HeartbeatState {
    pub fn new(info: RegisterRequest) -> Self {
        Self { info }
    }

    /// Advances the last heartbeat timestamp to now
    pub fn touch(&mut self) {
        self.info.touch();
    }

    pub fn info(&self) -> &RegisterRequest {
        &self.info
    }

    /// Unix milliseconds of the last heartbeat
    pub fn last_heartbeat(&self) -> i64 {
        self.info.last_heartbeat
    }
}

/// Starts the heartbeat loop in the background
///
/// # Arguments
/// * `client` - Task server client
/// * `info` - Registration info, with the assigned runner ID filled in
/// * `interval` - Wait between heartbeats
/// * `timeout` - Deadline for each heartbeat call
/// * `cancel` - Stops the loop
pub fn spawn(
    client: Arc<dyn TaskClient>,
    info: RegisterRequest,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut state = HeartbeatState::new(info);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("heartbeat loop stopped");
                    return;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            state.touch();
            debug!("Sending heartbeat");

            if let Err(e) = bounded(timeout, client.heartbeat(state.info(), &cancel)).await {
                error!("could not send heartbeat: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_advances_timestamp() {
        let mut info = RegisterRequest::new("acc", "runner", "secret");
        info.last_heartbeat = 0;

        let mut state = HeartbeatState::new(info);
        state.touch();
        assert!(state.last_heartbeat() > 0);

        let first = state.last_heartbeat();
        state.touch();
        assert!(state.last_heartbeat() >= first);
    }
}
