use serde::{Deserialize, Serialize};

use crate::room::{Command, Room};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join", rename_all = "camelCase")]
    Join {
        room_id: String,
        username: String,
        #[serde(default)]
        peer_id: Option<String>,
    },
    #[serde(rename = "update_task", rename_all = "camelCase")]
    UpdateTask { room_id: String, task: String },
    #[serde(rename = "toggle_timer", rename_all = "camelCase")]
    ToggleTimer { room_id: String },
    #[serde(rename = "skip_phase", rename_all = "camelCase")]
    SkipPhase { room_id: String },
    #[serde(rename = "leave_room")]
    LeaveRoom,
}

impl ClientMessage {
    /// Splits a room-scoped message into its target room and command.
    /// `LeaveRoom` names no room; it applies to the sender's current one.
    pub fn into_command(self) -> Option<(String, Command)> {
        match self {
            ClientMessage::Join {
                room_id,
                username,
                peer_id,
            } => Some((room_id, Command::Join { username, peer_id })),
            ClientMessage::UpdateTask { room_id, task } => {
                Some((room_id, Command::UpdateTask { task }))
            }
            ClientMessage::ToggleTimer { room_id } => Some((room_id, Command::ToggleTimer)),
            ClientMessage::SkipPhase { room_id } => Some((room_id, Command::SkipPhase)),
            ClientMessage::LeaveRoom => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "connected", rename_all = "camelCase")]
    Connected { connection_id: String },
    #[serde(rename = "update_room")]
    UpdateRoom { room: Room },
    #[serde(rename = "timer_sync")]
    TimerSync { timer: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_join() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "join",
            "roomId": "r1",
            "username": "alice",
            "peerId": "p-1"
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join {
                room_id: "r1".to_string(),
                username: "alice".to_string(),
                peer_id: Some("p-1".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_join_without_peer() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join","roomId":"r1","username":"bob"}"#).unwrap();
        assert_eq!(
            msg.into_command(),
            Some((
                "r1".to_string(),
                Command::Join {
                    username: "bob".to_string(),
                    peer_id: None,
                }
            ))
        );
    }

    #[test]
    fn test_parse_host_commands() {
        let toggle: ClientMessage =
            serde_json::from_str(r#"{"type":"toggle_timer","roomId":"r1"}"#).unwrap();
        assert_eq!(
            toggle.into_command(),
            Some(("r1".to_string(), Command::ToggleTimer))
        );
        let skip: ClientMessage =
            serde_json::from_str(r#"{"type":"skip_phase","roomId":"r1"}"#).unwrap();
        assert_eq!(skip.into_command(), Some(("r1".to_string(), Command::SkipPhase)));
    }

    #[test]
    fn test_leave_room_has_no_target() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"leave_room"}"#).unwrap();
        assert_eq!(msg.into_command(), None);
    }

    #[test]
    fn test_reject_unknown_type() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"chat","roomId":"r1"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"update_task","roomId":"r1"}"#)
            .is_err());
    }

    #[test]
    fn test_server_message_wire_format() {
        let sync = serde_json::to_value(ServerMessage::TimerSync { timer: 42 }).unwrap();
        assert_eq!(sync, json!({"type": "timer_sync", "timer": 42}));

        let hello = serde_json::to_value(ServerMessage::Connected {
            connection_id: "c1".to_string(),
        })
        .unwrap();
        assert_eq!(hello, json!({"type": "connected", "connectionId": "c1"}));
    }
}
