mod webrtc;

pub use webrtc::WebRtcFactory;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chorus_core::{ConferenceError, Direction, SdpKind, StreamId};
use tokio::sync::mpsc;

/// Events raised by an underlying media transport, tagged with the stream
/// they belong to so every record can funnel into one session channel.
#[derive(Debug)]
pub enum TransportEvent {
    /// Locally gathered ICE candidate, emitted as soon as the transport
    /// produces it regardless of negotiation state.
    LocalCandidate {
        stream_id: StreamId,
        candidate: String,
        label: u32,
        id: String,
    },
    Connected(StreamId),
    Disconnected(StreamId),
    Failed(StreamId),
    DataChannelOpen(StreamId),
    DataChannelMessage(StreamId, Bytes),
}

/// The media engine boundary. The conference core only issues and consumes
/// session-description and candidate values; gathering, media flow and
/// capture live behind this trait.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Create the data channel on the offering side so one exists
    /// symmetrically in publish-play and peer-to-peer topologies.
    async fn create_data_channel(&self) -> Result<()>;

    /// Produce a local offer and set it as the local description.
    async fn create_offer(&self) -> Result<String>;

    /// Produce a local answer and set it as the local description.
    async fn create_answer(&self) -> Result<String>;

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()>;

    /// Apply a remote ICE candidate. Buffering of candidates that arrive
    /// before the remote description is the transport's concern.
    async fn add_remote_candidate(&self, candidate: String, label: u32, id: String) -> Result<()>;

    /// Send one text frame over the data channel. Errors when the channel is
    /// not open; the caller rejects rather than queues.
    async fn send_text(&self, text: String) -> Result<()>;

    /// Gate the audio path for this connection. The capture/playout layer is
    /// external and consults this flag.
    fn set_audio_enabled(&self, enabled: bool);

    async fn close(&self) -> Result<()>;
}

/// Explicitly constructed, owned factory for media transports. Passed to the
/// conference session instead of living behind a process-global singleton;
/// its lifetime is tied to the session that owns it.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        stream_id: StreamId,
        direction: Direction,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn MediaTransport>, ConferenceError>;
}
