pub mod config;
pub mod connection;
pub mod room;
pub mod signaling;
pub mod stats;
pub mod transport;

pub use config::ConferenceConfig;
pub use room::{ConferenceCommand, ConferenceEvent, ConferenceHandle, ConferenceSession, connect};
pub use signaling::{SignalingChannel, SignalingEvent, SignalingOutput};
pub use transport::{MediaTransport, TransportEvent, TransportFactory, WebRtcFactory};
