use crate::model::stream::StreamId;
use serde::{Deserialize, Serialize};

/// Notification definition markers used by the server.
pub mod notification {
    pub const JOINED_ROOM: &str = "joinedRoom";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// SDP description kind carried by `takeConfiguration`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

fn candidate_marker() -> String {
    "candidate".to_string()
}

/// One signaling frame, client to server or server to client. The protocol is
/// flat JSON dispatched on the `command` field, one object per websocket text
/// frame. Commands the codec does not know are decoded as `Unknown` and
/// ignored by the session rather than treated as a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum SignalMessage {
    #[serde(rename = "joinRoom", rename_all = "camelCase")]
    JoinRoom {
        room_id: String,
        /// Preferred stream id; empty requests a server-assigned one.
        stream_id: String,
    },

    #[serde(rename = "leaveRoom", rename_all = "camelCase")]
    LeaveRoom { room_id: String, stream_id: String },

    #[serde(rename = "getRoomInfo", rename_all = "camelCase")]
    GetRoomInfo { room_id: String, stream_id: String },

    #[serde(rename = "takeConfiguration", rename_all = "camelCase")]
    TakeConfiguration {
        stream_id: StreamId,
        #[serde(rename = "type")]
        sdp_type: SdpKind,
        sdp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },

    #[serde(rename = "takeCandidate", rename_all = "camelCase")]
    TakeCandidate {
        stream_id: StreamId,
        #[serde(rename = "type", default = "candidate_marker")]
        kind: String,
        candidate: String,
        label: u32,
        id: String,
    },

    #[serde(rename = "notification", rename_all = "camelCase")]
    Notification {
        definition: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stream_id: Option<StreamId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        streams: Option<Vec<StreamId>>,
    },

    /// Response to `getRoomInfo`: the current full membership list.
    #[serde(rename = "roomInformation", rename_all = "camelCase")]
    RoomInformation {
        #[serde(default)]
        streams: Vec<StreamId>,
    },

    /// Server-reported semantic error (`no_stream_exist`, `unauthorized_access`, ...).
    #[serde(rename = "error", rename_all = "camelCase")]
    Error { definition: String },

    #[serde(other)]
    Unknown,
}

impl SignalMessage {
    pub fn candidate(stream_id: StreamId, candidate: String, label: u32, id: String) -> Self {
        SignalMessage::TakeCandidate {
            stream_id,
            kind: candidate_marker(),
            candidate,
            label,
            id,
        }
    }

    pub fn configuration(
        stream_id: StreamId,
        sdp_type: SdpKind,
        sdp: String,
        token: Option<String>,
    ) -> Self {
        SignalMessage::TakeConfiguration {
            stream_id,
            sdp_type,
            sdp,
            token,
        }
    }
}
