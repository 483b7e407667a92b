//! Realtime event envelope.
//!
//! Every outbound frame is a JSON object `{"event": ..., "data": {...}}`.
//! Post lifecycle events carry whatever the triggering service committed;
//! the registry does not interpret payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_types::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WsEvent {
    /// Welcome frame sent on connect. `user_id` is absent for anonymous
    /// connections.
    Connected { user_id: Option<UserId> },
    /// Acknowledgement for an inbound ping control frame
    Pong,
    /// Personal notification for one identity
    Notification(NotificationPayload),
    NewPost(serde_json::Value),
    UpdatePost(serde_json::Value),
    DeletePost(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub id: i64,
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_pseudonym: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let event = WsEvent::NewPost(json!({"id": "p1", "title": "hello"}));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "new_post");
        assert_eq!(value["data"]["id"], "p1");
    }

    #[test]
    fn test_pong_has_no_data() {
        let value = serde_json::to_value(WsEvent::Pong).unwrap();
        assert_eq!(value, json!({"event": "pong"}));
    }

    #[test]
    fn test_connected_anonymous() {
        let value = serde_json::to_value(WsEvent::Connected { user_id: None }).unwrap();
        assert_eq!(value["event"], "connected");
        assert!(value["data"]["user_id"].is_null());
    }
}
