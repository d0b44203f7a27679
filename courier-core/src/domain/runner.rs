//! Runner domain model
//!
//! Identity of a registered runner, as seen by the process that registered it.

use serde::{Deserialize, Serialize};

/// A runner that registered with the task server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerInfo {
    /// Server-assigned identifier, stable for the process lifetime
    pub id: String,

    /// Host name reported at registration
    pub host: String,

    /// Outbound IP reported at registration
    pub ip: String,

    /// Human readable runner name
    pub name: String,
}

impl std::fmt::Display for RunnerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}@{}, {})", self.name, self.id, self.host, self.ip)
    }
}
