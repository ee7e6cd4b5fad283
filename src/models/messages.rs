use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HelloMessage {
    #[serde(default)]
    pub session_id: Option<String>,
    pub device_token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimMessage {
    pub char_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseMessage {
    pub char_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatMessage {
    pub char_id: String,
}

/// Connection-level liveness ping. Carries no payload.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceMessage {}

/// Messages a browser (or [`crate::clients::LocksClient`]) sends to the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "hello")]
    Hello(HelloMessage),
    #[serde(rename = "claim")]
    Claim(ClaimMessage),
    #[serde(rename = "release")]
    Release(ReleaseMessage),
    #[serde(rename = "heartbeat")]
    Heartbeat(HeartbeatMessage),
    #[serde(rename = "presence")]
    Presence(PresenceMessage),
}

impl ClientMessage {
    /// Parse a text frame. Returns `None` for anything that is not a well formed
    /// message: bad JSON, a non-object frame, unknown `type`, empty character ids
    /// or device tokens.
    pub fn parse(text: &str) -> Option<Self> {
        // Tagged enums also deserialize from arrays; only objects are messages.
        let value: serde_json::Value = serde_json::from_str(text).ok()?;
        if !value.is_object() {
            return None;
        }
        let msg: ClientMessage = serde_json::from_value(value).ok()?;
        msg.normalized()
    }

    fn normalized(self) -> Option<Self> {
        match self {
            ClientMessage::Hello(mut hello) => {
                hello.device_token = non_empty(hello.device_token)?;
                hello.session_id = hello.session_id.and_then(non_empty);
                Some(ClientMessage::Hello(hello))
            }
            ClientMessage::Claim(m) => Some(ClientMessage::Claim(ClaimMessage {
                char_id: non_empty(m.char_id)?,
            })),
            ClientMessage::Release(m) => Some(ClientMessage::Release(ReleaseMessage {
                char_id: non_empty(m.char_id)?,
            })),
            ClientMessage::Heartbeat(m) => Some(ClientMessage::Heartbeat(HeartbeatMessage {
                char_id: non_empty(m.char_id)?,
            })),
            presence @ ClientMessage::Presence(_) => Some(presence),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// An image was stored for the room's slide.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageAddedMessage {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

/// An image was deleted from the room's slide.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageRemovedMessage {
    pub key: String,
}

/// One row of a snapshot, relative to the device that receives it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LockView {
    pub char_id: String,
    pub locked: bool,
    pub is_self: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    pub locks: Vec<LockView>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub char_id: String,
    pub locked: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResultMessage {
    pub char_id: String,
    pub ok: bool,
}

/// Messages the server pushes to a connection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "snapshot")]
    Snapshot(SnapshotMessage),
    #[serde(rename = "status")]
    Status(StatusMessage),
    #[serde(rename = "claim-result")]
    ClaimResult(ClaimResultMessage),
    #[serde(rename = "image-added")]
    ImageAdded(ImageAddedMessage),
    #[serde(rename = "image-removed")]
    ImageRemoved(ImageRemovedMessage),
}

impl ServerMessage {
    pub fn status(char_id: &str, locked: bool) -> Self {
        ServerMessage::Status(StatusMessage {
            char_id: char_id.to_string(),
            locked,
        })
    }

    pub fn claim_result(char_id: &str, ok: bool) -> Self {
        ServerMessage::ClaimResult(ClaimResultMessage {
            char_id: char_id.to_string(),
            ok,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_browser_frames() {
        let hello = ClientMessage::parse(r#"{"type":"hello","sessionId":"abc123","deviceToken":"dev-1"}"#);
        assert_eq!(
            hello,
            Some(ClientMessage::Hello(HelloMessage {
                session_id: Some("abc123".to_string()),
                device_token: "dev-1".to_string(),
            }))
        );

        let claim = ClientMessage::parse(r#"{"type":"claim","charId":" hare "}"#);
        assert_eq!(
            claim,
            Some(ClientMessage::Claim(ClaimMessage {
                char_id: "hare".to_string()
            }))
        );

        let presence = ClientMessage::parse(r#"{"type":"presence"}"#);
        assert_eq!(presence, Some(ClientMessage::Presence(PresenceMessage {})));
    }

    #[test]
    fn drops_malformed_frames() {
        assert_eq!(ClientMessage::parse("not json"), None);
        assert_eq!(ClientMessage::parse(r#"{"type":"teleport"}"#), None);
        assert_eq!(ClientMessage::parse(r#"{"type":"claim"}"#), None);
        assert_eq!(ClientMessage::parse(r#"{"type":"claim","charId":"   "}"#), None);
        assert_eq!(ClientMessage::parse(r#"{"type":"hello","deviceToken":""}"#), None);
        assert_eq!(ClientMessage::parse(r#"["claim","hare"]"#), None);
        assert_eq!(ClientMessage::parse(r#"["hello","abc123","dev-1"]"#), None);
        assert_eq!(ClientMessage::parse(r#""claim""#), None);
    }

    #[test]
    fn server_messages_use_wire_names() {
        let result = serde_json::to_value(ServerMessage::claim_result("hare", false)).unwrap();
        assert_eq!(result, json!({"type": "claim-result", "charId": "hare", "ok": false}));

        let snapshot = ServerMessage::Snapshot(SnapshotMessage {
            locks: vec![LockView {
                char_id: "tortoise".to_string(),
                locked: true,
                is_self: false,
            }],
        });
        assert_eq!(
            serde_json::to_value(snapshot).unwrap(),
            json!({"type": "snapshot", "locks": [{"charId": "tortoise", "locked": true, "isSelf": false}]})
        );

        let removed = ServerMessage::ImageRemoved(ImageRemovedMessage {
            key: "abc123/wolf-story/2/hare.png".to_string(),
        });
        assert_eq!(
            serde_json::to_value(removed).unwrap(),
            json!({"type": "image-removed", "key": "abc123/wolf-story/2/hare.png"})
        );
    }
}
