//! Courier Core
//!
//! Wire types shared by the task server client and the runner.
//!
//! This crate contains:
//! - Domain types: tasks, task events, task results and runner identity
//! - DTOs: request/response envelopes exchanged with the task server

pub mod domain;
pub mod dto;
mod nullable;
