//! Task DTOs

use serde::{Deserialize, Serialize};

use crate::domain::task::TaskEvent;

/// Response to a task-events poll
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskEventsResponse {
    #[serde(
        rename = "delegateTaskEvents",
        default,
        deserialize_with = "crate::nullable::or_default"
    )]
    pub events: Vec<TaskEvent>,
}
