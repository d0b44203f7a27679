//! Runner configuration
//!
//! Defines all configurable parameters for the runner including
//! task server connection settings, worker pool size, and loop timings.

use anyhow::Context;
use std::time::Duration;

/// Runner configuration
///
/// All timeouts and intervals are configurable to allow tuning
/// for different deployment scenarios (dev vs prod, fast vs slow networks).
#[derive(Debug, Clone)]
pub struct Config {
    /// Account the runner works for
    pub account_id: String,

    /// Shared secret presented to the task server
    pub account_secret: String,

    /// Task server base URL (e.g., "https://tasks.example.com")
    pub manager_endpoint: String,

    /// Name the runner registers under
    pub name: String,

    /// Tags the runner accepts
    pub tags: Vec<String>,

    /// Number of tasks executed concurrently
    pub parallel_workers: usize,

    /// How often to poll the task server for task events
    pub poll_interval: Duration,

    /// Time allowed for a single task-events call
    pub task_events_timeout: Duration,

    /// How often to send heartbeats
    pub heartbeat_interval: Duration,

    /// Time allowed for a single heartbeat call
    pub heartbeat_timeout: Duration,

    /// Time allowed for a single acquire call
    pub acquire_timeout: Duration,

    /// Time allowed for registration, retries included
    pub register_timeout: Duration,

    /// Time allowed for reporting a task status, retries included
    pub status_timeout: Duration,

    /// Wait between attempts of retried calls
    pub retry_interval: Duration,

    /// Accept invalid TLS certificates from the task server
    pub skip_verify: bool,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(account_id: String, account_secret: String, manager_endpoint: String) -> Self {
        Self {
            account_id,
            account_secret,
            manager_endpoint,
            name: format!("runner-{}", uuid::Uuid::new_v4().simple()),
            tags: Vec::new(),
            parallel_workers: 2,
            poll_interval: Duration::from_secs(3),
            task_events_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(10),
            heartbeat_timeout: Duration::from_secs(15),
            acquire_timeout: Duration::from_secs(30),
            register_timeout: Duration::from_secs(60),
            status_timeout: Duration::from_secs(300),
            retry_interval: Duration::from_secs(10),
            skip_verify: false,
        }
    }

    /// Loads and validates configuration from environment variables
    ///
    /// Account credentials and the endpoint have no usable defaults, so a
    /// missing one is an error rather than a fallback.
    ///
    /// Expected environment variables:
    /// - ACCOUNT_ID (required)
    /// - ACCOUNT_SECRET (required)
    /// - MANAGER_ENDPOINT (required)
    /// - RUNNER_NAME (optional, default: generated)
    /// - RUNNER_TAGS (optional, comma separated)
    /// - PARALLEL_WORKERS (optional, default: 2)
    /// - POLL_INTERVAL (optional, seconds, default: 3)
    /// - TASK_EVENTS_TIMEOUT (optional, seconds, default: 30)
    /// - HEARTBEAT_INTERVAL (optional, seconds, default: 10)
    /// - HEARTBEAT_TIMEOUT (optional, seconds, default: 15)
    /// - ACQUIRE_TIMEOUT (optional, seconds, default: 30)
    /// - REGISTER_TIMEOUT (optional, seconds, default: 60)
    /// - STATUS_TIMEOUT (optional, seconds, default: 300)
    /// - RETRY_INTERVAL (optional, seconds, default: 10)
    /// - SKIP_VERIFY (optional, default: false)
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    fn load_from(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let config = Self::from_lookup(lookup).context("failed to load configuration")?;
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    /// Builds configuration from an arbitrary key lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} environment variable not set", key))
        };
        let seconds = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        let mut config = Self::new(
            required("ACCOUNT_ID")?,
            required("ACCOUNT_SECRET")?,
            required("MANAGER_ENDPOINT")?,
        );

        if let Some(name) = lookup("RUNNER_NAME").filter(|n| !n.is_empty()) {
            config.name = name;
        }

        if let Some(tags) = lookup("RUNNER_TAGS") {
            config.tags = tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.parallel_workers = lookup("PARALLEL_WORKERS")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(config.parallel_workers);

        config.poll_interval = seconds("POLL_INTERVAL", config.poll_interval);
        config.task_events_timeout = seconds("TASK_EVENTS_TIMEOUT", config.task_events_timeout);
        config.heartbeat_interval = seconds("HEARTBEAT_INTERVAL", config.heartbeat_interval);
        config.heartbeat_timeout = seconds("HEARTBEAT_TIMEOUT", config.heartbeat_timeout);
        config.acquire_timeout = seconds("ACQUIRE_TIMEOUT", config.acquire_timeout);
        config.register_timeout = seconds("REGISTER_TIMEOUT", config.register_timeout);
        config.status_timeout = seconds("STATUS_TIMEOUT", config.status_timeout);
        config.retry_interval = seconds("RETRY_INTERVAL", config.retry_interval);

        config.skip_verify = lookup("SKIP_VERIFY")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(config)
    }

    /// Adds a tag the runner accepts
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.account_id.is_empty() {
            anyhow::bail!("account_id cannot be empty");
        }

        if self.account_secret.is_empty() {
            anyhow::bail!("account_secret cannot be empty");
        }

        if self.name.is_empty() {
            anyhow::bail!("name cannot be empty");
        }

        if !self.manager_endpoint.starts_with("http://")
            && !self.manager_endpoint.starts_with("https://")
        {
            anyhow::bail!("manager_endpoint must start with http:// or https://");
        }

        if self.parallel_workers == 0 {
            anyhow::bail!("parallel_workers must be greater than 0");
        }

        for (name, value) in [
            ("poll_interval", self.poll_interval),
            ("task_events_timeout", self.task_events_timeout),
            ("heartbeat_interval", self.heartbeat_interval),
            ("heartbeat_timeout", self.heartbeat_timeout),
            ("acquire_timeout", self.acquire_timeout),
            ("register_timeout", self.register_timeout),
            ("status_timeout", self.status_timeout),
            ("retry_interval", self.retry_interval),
        ] {
            if value.is_zero() {
                anyhow::bail!("{} must be greater than 0", name);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn valid() -> Config {
        Config::new(
            "acc".to_string(),
            "secret".to_string(),
            "http://localhost:8080".to_string(),
        )
    }

    #[test]
    fn test_default_config() {
        let config = valid();
        assert_eq!(config.parallel_workers, 2);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(15));
        assert_eq!(config.task_events_timeout, Duration::from_secs(30));
        assert_eq!(config.retry_interval, Duration::from_secs(10));
        assert!(config.name.starts_with("runner-"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = valid();

        config.account_id = String::new();
        assert!(config.validate().is_err());
        config.account_id = "acc".to_string();

        config.manager_endpoint = "not-a-url".to_string();
        assert!(config.validate().is_err());
        config.manager_endpoint = "https://tasks.example.com".to_string();
        assert!(config.validate().is_ok());

        config.parallel_workers = 0;
        assert!(config.validate().is_err());
        config.parallel_workers = 4;

        config.heartbeat_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            ("ACCOUNT_ID", "acc"),
            ("ACCOUNT_SECRET", "secret"),
            ("MANAGER_ENDPOINT", "https://tasks.example.com"),
            ("RUNNER_NAME", "builder"),
            ("RUNNER_TAGS", "linux, gpu,,"),
            ("PARALLEL_WORKERS", "8"),
            ("POLL_INTERVAL", "1"),
            ("SKIP_VERIFY", "true"),
        ]))
        .unwrap();

        assert_eq!(config.name, "builder");
        assert_eq!(config.tags, vec!["linux".to_string(), "gpu".to_string()]);
        assert_eq!(config.parallel_workers, 8);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
        assert!(config.skip_verify);
    }

    #[test]
    fn test_from_lookup_requires_account() {
        let err = Config::from_lookup(lookup(&[("ACCOUNT_SECRET", "secret")])).unwrap_err();
        assert!(err.to_string().contains("ACCOUNT_ID"));
    }

    #[test]
    fn test_load_rejects_missing_secret_and_bad_values() {
        let err = Config::load_from(lookup(&[
            ("ACCOUNT_ID", "acc"),
            ("MANAGER_ENDPOINT", "https://tasks.example.com"),
        ]))
        .unwrap_err();
        assert!(format!("{:#}", err).contains("ACCOUNT_SECRET"));

        let err = Config::load_from(lookup(&[
            ("ACCOUNT_ID", "acc"),
            ("ACCOUNT_SECRET", "secret"),
            ("MANAGER_ENDPOINT", "tasks.example.com"),
        ]))
        .unwrap_err();
        assert!(format!("{:#}", err).contains("manager_endpoint"));

        let config = Config::load_from(lookup(&[
            ("ACCOUNT_ID", "acc"),
            ("ACCOUNT_SECRET", "secret"),
            ("MANAGER_ENDPOINT", "https://tasks.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.parallel_workers, 2);
    }

    #[test]
    fn test_with_tag() {
        let config = valid().with_tag("linux").with_tag("arm64");
        assert_eq!(config.tags, vec!["linux".to_string(), "arm64".to_string()]);
    }
}
