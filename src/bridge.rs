//! Host messaging envelope
//!
//! Edit events and host requests cross a process boundary as a small
//! discriminated envelope. This core does not care how that boundary is
//! implemented, only that delivery is reliable, ordered per sender, and that
//! a response correlates to its request by id.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::value::EditEvent;

/// Name of the event carrying a [`EditEvent`] payload
pub const VALUE_EDITED: &str = "valueEdited";

/// One message on the host bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BridgeMessage {
    Request {
        id: u32,
        method: String,
        #[serde(default)]
        params: Value,
    },
    Response {
        id: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Event {
        event: String,
        data: Value,
    },
}

impl BridgeMessage {
    pub fn request(id: u32, method: impl Into<String>, params: Value) -> Self {
        BridgeMessage::Request {
            id,
            method: method.into(),
            params,
        }
    }

    pub fn success(id: u32, result: Value) -> Self {
        BridgeMessage::Response {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u32, error: impl Into<String>) -> Self {
        BridgeMessage::Response {
            id,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Wrap an outgoing edit event, type path attached in the payload
    pub fn edit_event(event: &EditEvent) -> Result<Self> {
        Ok(BridgeMessage::Event {
            event: VALUE_EDITED.to_string(),
            data: serde_json::to_value(event)?,
        })
    }

    /// Whether this message answers the request with the given id
    pub fn answers(&self, request_id: u32) -> bool {
        matches!(self, BridgeMessage::Response { id, .. } if *id == request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_round_trip() {
        let message = BridgeMessage::request(7, "getTypeSchema", json!({ "typePath": "glam::Vec3" }));
        let wire = serde_json::to_string(&message).unwrap();
        assert!(wire.contains("\"kind\":\"request\""));
        let back: BridgeMessage = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn response_correlates_by_id() {
        let response = BridgeMessage::success(7, json!(null));
        assert!(response.answers(7));
        assert!(!response.answers(8));
        assert!(!BridgeMessage::request(7, "x", json!(null)).answers(7));
    }

    #[test]
    fn edit_event_carries_type_path() {
        let event = EditEvent {
            type_path: "bevy_transform::components::transform::Transform".to_string(),
            path: "translation".to_string(),
            value: json!([1.0, 2.0, 3.0]),
        };
        let message = BridgeMessage::edit_event(&event).unwrap();
        match message {
            BridgeMessage::Event { event: name, data } => {
                assert_eq!(name, VALUE_EDITED);
                assert_eq!(data["typePath"], "bevy_transform::components::transform::Transform");
                assert_eq!(data["path"], "translation");
            }
            other => panic!("Expected event, got {:?}", other),
        }
    }
}
