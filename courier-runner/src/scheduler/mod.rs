//! Scheduler layer for the runner
//!
//! This layer registers the runner, keeps it alive with heartbeats, polls
//! the task server for task events and drives the worker pool that acquires,
//! executes and reports tasks.

pub mod heartbeat;
mod in_flight;
pub mod poller;

pub use heartbeat::HeartbeatState;
pub use in_flight::{InFlight, InFlightGuard};
pub use poller::{FilterFn, Poller};

use courier_client::{ClientError, Result};
use std::future::Future;
use std::time::Duration;

/// Runs a client call with a deadline of its own
async fn bounded<T>(limit: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(ClientError::Timeout(limit)))
}
