use bytes::Bytes;
use chorus_core::StreamId;

/// Typed events emitted by the conference session, one channel per session.
/// Consumers select on this instead of registering callbacks.
#[derive(Debug, PartialEq)]
pub enum ConferenceEvent {
    /// Current WebRTC watcher count for the published stream. Emitted only
    /// when the local role publishes.
    ListenerCount(u32),
    /// The transport for this stream reported connected.
    StreamConnected(StreamId),
    /// The record for this stream was torn down (left the room, remote
    /// hangup, or local stop).
    StreamDisconnected(StreamId),
    /// Negotiation or connectivity failed terminally for this stream. The
    /// record has been closed; unrelated records are unaffected.
    StreamFailed { stream_id: StreamId, reason: String },
    /// Decoded application payload received over a data channel.
    DataReceived { stream_id: StreamId, data: Bytes },
    /// Server-reported semantic error, already human-readable.
    ServerError { message: String },
    /// The signaling channel disconnected. No automatic reconnection.
    SignalingDisconnected { reason: String },
    /// Transport-level signaling failure. No automatic reconnection.
    SignalingError { reason: String },
    /// Session teardown finished.
    Closed,
}
