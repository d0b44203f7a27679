//! Core domain types
//!
//! These types are what the runner works with once a call to the task server
//! has completed. They are shared between the client (which decodes them) and
//! the runner (which executes them).

pub mod runner;
pub mod task;
