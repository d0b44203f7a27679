//! Task domain types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Notification that a task is ready to be claimed
///
/// Lives only between the poll response and the worker that consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEvent {
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub account_id: String,
    #[serde(rename = "delegateTaskId")]
    pub task_id: String,
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub sync: bool,
}

/// Full unit of work, returned by acquiring a [`TaskEvent`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    /// Opaque payload, interpreted only by the handler for `task_type`
    #[serde(default)]
    pub data: JsonValue,
    #[serde(rename = "async", default, deserialize_with = "crate::nullable::or_default")]
    pub is_async: bool,
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub timeout: i64,
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub logging: LogInfo,
    #[serde(rename = "delegate", default, deserialize_with = "crate::nullable::or_default")]
    pub delegate: DelegateInfo,
    #[serde(default)]
    pub capabilities: JsonValue,
}

/// Logging context attached to a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogInfo {
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub token: String,
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub abstractions: HashMap<String, String>,
}

/// Delegate context attached to a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateInfo {
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub id: String,
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub instance_id: String,
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub token: String,
}

/// Outcome code reported for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "RETRY_ON_OTHER_DELEGATE")]
    RetryOnOtherRunner,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Ok => write!(f, "OK"),
            TaskStatus::Failed => write!(f, "FAILED"),
            TaskStatus::RetryOnOtherRunner => write!(f, "RETRY_ON_OTHER_DELEGATE"),
        }
    }
}

/// Result of executing a task, sent back to the task server once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub id: String,
    #[serde(default)]
    pub data: JsonValue,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(rename = "code")]
    pub status: TaskStatus,
}

impl TaskResult {
    /// Builds a successful result from the bytes a handler produced
    pub fn ok(task: &Task, output: &[u8]) -> Self {
        Self {
            id: task.id.clone(),
            data: payload_from_bytes(output),
            task_type: task.task_type.clone(),
            status: TaskStatus::Ok,
        }
    }

    /// Builds a failed result carrying the error message as payload
    pub fn failed(task: &Task, message: impl Into<String>) -> Self {
        Self {
            id: task.id.clone(),
            data: JsonValue::String(message.into()),
            task_type: task.task_type.clone(),
            status: TaskStatus::Failed,
        }
    }
}

/// Converts handler output into a JSON payload
///
/// Empty output maps to `null`, valid JSON is embedded as-is and anything
/// else is carried as a string.
pub fn payload_from_bytes(bytes: &[u8]) -> JsonValue {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return JsonValue::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(bytes).into_owned()))
}
