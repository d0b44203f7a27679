//! Task routing
//!
//! Maps a task type to the handler that executes it. The runner advertises
//! [`Router::routes`] at registration and refuses tasks of any other type.

use anyhow::{Context, Result};
use async_trait::async_trait;
use courier_core::domain::task::Task;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Executes tasks of one type
#[async_trait]
pub trait Handler: Send + Sync {
    /// Executes the task and returns the result payload bytes
    async fn handle(&self, task: &Task) -> Result<Vec<u8>>;
}

/// Lookup from task type to handler
pub trait Router: Send + Sync {
    /// Task types this router can execute
    fn routes(&self) -> Vec<String>;

    /// Handler for a task type, if one is registered
    fn route(&self, task_type: &str) -> Option<Arc<dyn Handler>>;

    /// Checks whether a task type is among the advertised routes
    fn supports(&self, task_type: &str) -> bool {
        self.routes().iter().any(|route| route == task_type)
    }
}

/// Router backed by a map of handlers
#[derive(Default, Clone)]
pub struct HandlerRouter {
    handlers: BTreeMap<String, Arc<dyn Handler>>,
}

impl HandlerRouter {
    /// Creates an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler, replacing any previous one for the same type
    pub fn register(&mut self, task_type: impl Into<String>, handler: impl Handler + 'static) {
        self.handlers.insert(task_type.into(), Arc::new(handler));
    }

    /// Builder form of [`HandlerRouter::register`]
    pub fn with_handler(mut self, task_type: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.register(task_type, handler);
        self
    }
}

impl Router for HandlerRouter {
    fn routes(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    fn route(&self, task_type: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(task_type).cloned()
    }

    fn supports(&self, task_type: &str) -> bool {
        self.handlers.contains_key(task_type)
    }
}

/// Returns the task payload unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn handle(&self, task: &Task) -> Result<Vec<u8>> {
        json_output(&task.data)
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Serializes a handler response into indented JSON result bytes
pub fn json_output<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(value).context("failed to encode handler output")?;
    out.push(b'\n');
    Ok(out)
}

#[derive(Serialize)]
struct ErrorOutput<'a> {
    #[serde(rename = "error_msg")]
    message: &'a str,
    code: u16,
}

/// Builds an `{"error_msg": message, "code": code}` payload
pub fn error_output(message: impl AsRef<str>, code: u16) -> Vec<u8> {
    let out = ErrorOutput {
        message: message.as_ref(),
        code,
    };
    // A struct of a string and an integer always serializes.
    json_output(&out).unwrap_or_default()
}

/// [`error_output`] with code 400
pub fn bad_request_output(message: impl AsRef<str>) -> Vec<u8> {
    error_output(message, 400)
}

/// [`error_output`] with code 404
pub fn not_found_output(message: impl AsRef<str>) -> Vec<u8> {
    error_output(message, 404)
}

/// [`error_output`] with code 500
pub fn internal_error_output(message: impl AsRef<str>) -> Vec<u8> {
    error_output(message, 500)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(&'static str);

    #[async_trait]
    impl Handler for Fixed {
        async fn handle(&self, _task: &Task) -> Result<Vec<u8>> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    #[test]
    fn test_routes_are_sorted_and_unique() {
        let router = HandlerRouter::new()
            .with_handler("SHELL", Fixed("a"))
            .with_handler("ECHO", EchoHandler)
            .with_handler("SHELL", Fixed("b"));

        assert_eq!(router.routes(), vec!["ECHO".to_string(), "SHELL".to_string()]);
        assert!(router.supports("ECHO"));
        assert!(!router.supports("HTTP"));
        assert!(router.route("HTTP").is_none());
    }

    #[tokio::test]
    async fn test_route_dispatches_to_latest_handler() {
        let router = HandlerRouter::new()
            .with_handler("SHELL", Fixed("a"))
            .with_handler("SHELL", Fixed("b"));

        let handler = router.route("SHELL").unwrap();
        let out = handler.handle(&Task::default()).await.unwrap();
        assert_eq!(out, b"b");
    }

    #[tokio::test]
    async fn test_echo_handler() {
        let task = Task {
            data: json!({"msg": "hello"}),
            ..Default::default()
        };
        let out = EchoHandler.handle(&task).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value, json!({"msg": "hello"}));
    }

    #[test]
    fn test_json_output_is_indented() {
        let out = json_output(&json!({"a": 1})).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn test_error_output() {
        let value: serde_json::Value = serde_json::from_slice(&error_output("bad input", 422)).unwrap();
        assert_eq!(value, json!({"error_msg": "bad input", "code": 422}));

        let codes: Vec<_> = [
            bad_request_output("x"),
            not_found_output("x"),
            internal_error_output("x"),
        ]
        .iter()
        .map(|out| serde_json::from_slice::<serde_json::Value>(out).unwrap()["code"].clone())
        .collect();
        assert_eq!(codes, vec![json!(400), json!(404), json!(500)]);
    }
}
