//! Courier Runner
//!
//! A worker agent that registers with a task server, polls it for task
//! events and executes the tasks through pluggable handlers.
//!
//! Architecture:
//! - Configuration: settings from environment or defaults
//! - Router: maps task types to handlers
//! - Scheduler: registration, heartbeats, polling and the worker pool

pub mod config;
pub mod host;
pub mod router;
pub mod scheduler;

pub use config::Config;
pub use router::{EchoHandler, Handler, HandlerRouter, Router};
pub use scheduler::Poller;
