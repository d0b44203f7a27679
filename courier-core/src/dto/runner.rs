//! Runner DTOs
//!
//! Data transfer objects for registration and heartbeats.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Delegate type declared at registration
pub const DELEGATE_TYPE: &str = "DOCKER";

/// Identity facts sent once at registration and again with every heartbeat
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub account_id: String,

    /// Name of the runner
    #[serde(rename = "delegateName")]
    pub name: String,

    /// Shared secret presented by the runner
    #[serde(rename = "delegateRandomToken")]
    pub token: String,

    /// Server-assigned runner ID, empty until registration succeeds
    #[serde(rename = "delegateId", default)]
    pub id: String,

    #[serde(rename = "delegateType")]
    pub delegate_type: String,

    pub ng: bool,

    #[serde(rename = "pollingModeEnabled")]
    pub polling: bool,

    pub host_name: String,

    #[serde(default)]
    pub connected: bool,

    #[serde(default)]
    pub keep_alive_packet: bool,

    pub sequence_num: i32,

    pub ip: String,

    /// Task types this runner can execute
    pub supported_task_types: Vec<String>,

    pub tags: Vec<String>,

    /// Unix milliseconds of the last heartbeat
    #[serde(rename = "lastHeartBeat")]
    pub last_heartbeat: i64,

    pub heartbeat_as_object: bool,
}

impl RegisterRequest {
    /// Creates a registration request with the polling protocol flags set
    pub fn new(account_id: impl Into<String>, name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            name: name.into(),
            token: token.into(),
            delegate_type: DELEGATE_TYPE.to_string(),
            ng: true,
            polling: true,
            sequence_num: 1,
            heartbeat_as_object: true,
            last_heartbeat: Utc::now().timestamp_millis(),
            ..Default::default()
        }
    }

    /// Refreshes the heartbeat timestamp, never moving it backwards
    pub fn touch(&mut self) {
        self.last_heartbeat = self.last_heartbeat.max(Utc::now().timestamp_millis());
    }
}

/// Response to a registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub resource: RegisterResource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResource {
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub delegate_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_protocol_flags() {
        let req = RegisterRequest::new("acc", "runner-1", "secret");
        assert!(req.ng);
        assert!(req.polling);
        assert!(req.heartbeat_as_object);
        assert_eq!(req.sequence_num, 1);
        assert_eq!(req.delegate_type, "DOCKER");
        assert!(req.id.is_empty());
    }

    #[test]
    fn test_touch_is_monotonic() {
        let mut req = RegisterRequest::new("acc", "runner-1", "secret");
        req.last_heartbeat = i64::MAX - 1;
        req.touch();
        assert_eq!(req.last_heartbeat, i64::MAX - 1);

        req.last_heartbeat = 0;
        req.touch();
        assert!(req.last_heartbeat > 0);
    }

    #[test]
    fn test_wire_field_names() {
        let mut req = RegisterRequest::new("acc", "runner-1", "secret");
        req.supported_task_types = vec!["ECHO".to_string()];
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["accountId"], "acc");
        assert_eq!(value["delegateName"], "runner-1");
        assert_eq!(value["delegateRandomToken"], "secret");
        assert_eq!(value["pollingModeEnabled"], true);
        assert_eq!(value["supportedTaskTypes"][0], "ECHO");
        assert!(value.get("lastHeartBeat").is_some());
    }

    #[test]
    fn test_register_response_decodes() {
        let resp: RegisterResponse =
            serde_json::from_str(r#"{"resource":{"delegateId":"d-42"}}"#).unwrap();
        assert_eq!(resp.resource.delegate_id, "d-42");

        let resp: RegisterResponse = serde_json::from_str(r#"{"resource":null}"#).unwrap();
        assert!(resp.resource.delegate_id.is_empty());

        let resp: RegisterResponse =
            serde_json::from_str(r#"{"resource":{"delegateId":null}}"#).unwrap();
        assert!(resp.resource.delegate_id.is_empty());
    }
}
