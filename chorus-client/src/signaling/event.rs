use chorus_core::SignalMessage;

/// Ordered, single-consumer event stream emitted by the signaling channel.
#[derive(Debug)]
pub enum SignalingEvent {
    Connected,
    Disconnected(String),
    Message(SignalMessage),
    /// Transport-level failure. The channel does not reconnect on its own;
    /// recovery is the caller's responsibility.
    TransportError(String),
}
