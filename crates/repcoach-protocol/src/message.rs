//! Protocol message types for daemon communication.

use crate::frame::RawFrame;
use crate::version::ProtocolVersion;
use repcoach_core::ExerciseSnapshot;
use serde::{Deserialize, Serialize};

/// Message types a peer can send to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageType {
    /// Handshake; must be the first message on a connection
    Connect {
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },

    /// Subscribe to an exercise room
    Join {
        /// Exercise-type key, e.g. `"squat"`
        exercise: String,
    },

    /// Leave every exercise room
    Leave,

    /// One pose-estimator frame for an exercise; `null` is a detection gap
    Frame {
        exercise: String,
        frame: Option<RawFrame>,
    },

    /// Request the current state of every exercise
    Snapshot,

    Ping {
        /// Echoed back in the pong
        seq: u64,
    },

    /// Client disconnecting gracefully
    Disconnect,
}

/// Envelope for everything a peer sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    pub protocol_version: ProtocolVersion,

    #[serde(flatten)]
    pub message: MessageType,
}

impl ClientMessage {
    pub fn new(message: MessageType) -> Self {
        Self {
            protocol_version: ProtocolVersion::CURRENT,
            message,
        }
    }

    pub fn connect(client_id: Option<String>) -> Self {
        Self::new(MessageType::Connect { client_id })
    }

    pub fn join(exercise: &str) -> Self {
        Self::new(MessageType::Join {
            exercise: exercise.to_string(),
        })
    }

    pub fn leave() -> Self {
        Self::new(MessageType::Leave)
    }

    pub fn frame(exercise: &str, frame: Option<RawFrame>) -> Self {
        Self::new(MessageType::Frame {
            exercise: exercise.to_string(),
            frame,
        })
    }

    pub fn snapshot() -> Self {
        Self::new(MessageType::Snapshot)
    }

    pub fn ping(seq: u64) -> Self {
        Self::new(MessageType::Ping { seq })
    }

    pub fn disconnect() -> Self {
        Self::new(MessageType::Disconnect)
    }
}

/// Messages the daemon sends to peers.
///
/// `count`, `status`, `tips` and `cycle_complete` are room events; the
/// rest are direct replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Handshake accepted
    Connected {
        protocol_version: ProtocolVersion,
        /// Identity assigned to this connection
        client_id: String,
    },

    /// Handshake refused (version mismatch, capacity)
    Rejected {
        reason: String,
        protocol_version: ProtocolVersion,
    },

    /// Subscription to an exercise room confirmed
    Joined { exercise: String },

    /// Rooms removed by a `leave`
    Left { rooms: Vec<String> },

    /// Whole repetitions completed so far
    Count { exercise: String, value: u64 },

    Status { exercise: String, text: String },

    Tips { exercise: String, list: Vec<String> },

    /// A multi-pose sequence finished; `value` is the running cycle total
    CycleComplete { exercise: String, value: u64 },

    Snapshot { exercises: Vec<ExerciseSnapshot> },

    Pong { seq: u64 },

    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl ServerMessage {
    pub fn connected(client_id: String) -> Self {
        Self::Connected {
            protocol_version: ProtocolVersion::CURRENT,
            client_id,
        }
    }

    pub fn rejected(reason: &str) -> Self {
        Self::Rejected {
            reason: reason.to_string(),
            protocol_version: ProtocolVersion::CURRENT,
        }
    }

    pub fn count(exercise: &str, value: u64) -> Self {
        Self::Count {
            exercise: exercise.to_string(),
            value,
        }
    }

    pub fn status(exercise: &str, text: &str) -> Self {
        Self::Status {
            exercise: exercise.to_string(),
            text: text.to_string(),
        }
    }

    pub fn tips(exercise: &str, list: Vec<String>) -> Self {
        Self::Tips {
            exercise: exercise.to_string(),
            list,
        }
    }

    pub fn cycle_complete(exercise: &str, value: u64) -> Self {
        Self::CycleComplete {
            exercise: exercise.to_string(),
            value,
        }
    }

    pub fn error(message: &str) -> Self {
        Self::Error {
            message: message.to_string(),
            code: None,
        }
    }

    pub fn error_with_code(message: &str, code: &str) -> Self {
        Self::Error {
            message: message.to_string(),
            code: Some(code.to_string()),
        }
    }

    /// Wire name of the message type, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Rejected { .. } => "rejected",
            Self::Joined { .. } => "joined",
            Self::Left { .. } => "left",
            Self::Count { .. } => "count",
            Self::Status { .. } => "status",
            Self::Tips { .. } => "tips",
            Self::CycleComplete { .. } => "cycle_complete",
            Self::Snapshot { .. } => "snapshot",
            Self::Pong { .. } => "pong",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_wire_format() {
        let json = serde_json::to_value(ClientMessage::join("squat")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "protocol_version": {"major": 1, "minor": 0},
                "type": "join",
                "exercise": "squat"
            })
        );
    }

    #[test]
    fn test_frame_gap_parses() {
        let line = r#"{"protocol_version":{"major":1,"minor":0},"type":"frame","exercise":"pushup","frame":null}"#;
        let parsed: ClientMessage = serde_json::from_str(line).unwrap();
        match parsed.message {
            MessageType::Frame { exercise, frame } => {
                assert_eq!(exercise, "pushup");
                assert!(frame.is_none());
            }
            other => panic!("Expected frame message, got {other:?}"),
        }
    }

    #[test]
    fn test_room_events() {
        let json = serde_json::to_string(&ServerMessage::count("squat", 3)).unwrap();
        assert_eq!(json, r#"{"type":"count","exercise":"squat","value":3}"#);

        let json = serde_json::to_string(&ServerMessage::tips(
            "squat",
            vec!["Keep your back straight".to_string()],
        ))
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"tips","exercise":"squat","list":["Keep your back straight"]}"#
        );

        let msg = ServerMessage::cycle_complete("yoga-blocks", 1);
        assert_eq!(msg.kind(), "cycle_complete");
    }

    #[test]
    fn test_server_message_roundtrip() {
        let msg = ServerMessage::Left {
            rooms: vec!["squat".to_string(), "pushup".to_string()],
        };
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }
}
