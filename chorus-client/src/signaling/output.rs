use async_trait::async_trait;
use chorus_core::SignalMessage;

/// Outbound half of the signaling channel as seen by the conference session.
/// The session depends on this seam instead of a concrete socket so tests can
/// substitute a recording mock.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send(&self, msg: SignalMessage);

    /// Close the underlying connection. Sends queued before this call are
    /// flushed first.
    async fn disconnect(&self);
}
