//! Data Transfer Objects for task server communication
//!
//! Field names follow the task server's camelCase JSON API.

pub mod runner;
pub mod task;
