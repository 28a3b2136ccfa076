use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication. Sent only after the
    /// connection is attached to the bus, so nothing published after
    /// `Ready` can be missed.
    Ready { user_id: Uuid, username: String },

    /// A new message was stored
    MessageCreate(Message),
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identify_wire_shape() {
        let cmd: GatewayCommand =
            serde_json::from_value(json!({"type": "Identify", "data": {"token": "abc"}})).unwrap();
        assert_eq!(cmd, GatewayCommand::Identify { token: "abc".into() });
    }

    #[test]
    fn message_create_carries_message_as_data() {
        let message = Message {
            id: Uuid::nil(),
            content: "hello".into(),
            author_id: Uuid::nil(),
            author_name: "ada".into(),
            outcome: None,
            created_at: chrono::DateTime::default(),
        };
        let value = serde_json::to_value(GatewayEvent::MessageCreate(message)).unwrap();
        assert_eq!(value["type"], "MessageCreate");
        assert_eq!(value["data"]["content"], "hello");
        assert!(value["data"].get("outcome").is_none());
    }
}
