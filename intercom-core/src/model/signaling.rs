use crate::model::room::RoomId;
use crate::model::session::{IceCandidate, SessionDescription};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames a client sends to the relay.
///
/// `D` and `C` are the description and candidate payloads. Clients use the
/// typed defaults; the relay uses [`RawClientMessage`] so it never looks
/// inside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage<D = SessionDescription, C = IceCandidate> {
    Register { room_id: RoomId },
    Call { target_room: RoomId, offer: D },
    Answer { target_room: RoomId, answer: D },
    IceCandidate { target_room: RoomId, candidate: C },
    HangUp { target_room: RoomId },
}

/// Frames the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum RelayMessage<D = SessionDescription, C = IceCandidate> {
    Registered { room_id: RoomId },
    IncomingCall { from: RoomId, offer: D },
    CallAnswered { from: RoomId, answer: D },
    IceCandidate { from: RoomId, candidate: C },
    CallEnded { from: RoomId },
    /// A `call` reached no channel registered under `target_room`.
    TargetUnavailable { target_room: RoomId },
}

pub type RawClientMessage = ClientMessage<Value, Value>;
pub type RawRelayMessage = RelayMessage<Value, Value>;

impl<D, C> ClientMessage<D, C> {
    /// Room the frame is addressed to; `None` for `register`.
    pub fn target_room(&self) -> Option<&RoomId> {
        match self {
            ClientMessage::Register { .. } => None,
            ClientMessage::Call { target_room, .. }
            | ClientMessage::Answer { target_room, .. }
            | ClientMessage::IceCandidate { target_room, .. }
            | ClientMessage::HangUp { target_room } => Some(target_room),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Register { .. } => "register",
            ClientMessage::Call { .. } => "call",
            ClientMessage::Answer { .. } => "answer",
            ClientMessage::IceCandidate { .. } => "ice-candidate",
            ClientMessage::HangUp { .. } => "hang-up",
        }
    }
}

impl<D, C> RelayMessage<D, C> {
    pub fn kind(&self) -> &'static str {
        match self {
            RelayMessage::Registered { .. } => "registered",
            RelayMessage::IncomingCall { .. } => "incoming-call",
            RelayMessage::CallAnswered { .. } => "call-answered",
            RelayMessage::IceCandidate { .. } => "ice-candidate",
            RelayMessage::CallEnded { .. } => "call-ended",
            RelayMessage::TargetUnavailable { .. } => "target-unavailable",
        }
    }
}
