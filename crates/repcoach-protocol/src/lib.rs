//! repcoach Protocol - Wire protocol for daemon communication
//!
//! Newline-delimited JSON exchanged over the daemon's Unix socket. Two
//! kinds of peers speak it: subscribers, which join exercise rooms and
//! receive `count`/`status`/`tips` events, and pose feeds, which push
//! landmark frames for an exercise.

pub mod frame;
pub mod message;
pub mod version;

pub use frame::{RawFrame, RawLandmark};
pub use message::{ClientMessage, MessageType, ServerMessage};
pub use version::{ProtocolVersion, VersionError};
