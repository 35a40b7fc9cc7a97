use crate::signaling::SignalingOutput;
use crate::transport::MediaTransport;
use chorus_core::{ConferenceError, Direction, SdpKind, SignalMessage, StreamId};
use tracing::{debug, warn};

/// Negotiation lifecycle of one per-stream connection record.
///
/// `Idle → Negotiating → Connected → Closed`, with the error path
/// `Negotiating|Connected → Failed → Closed`. Failures are terminal and
/// reported; there is no retry inside the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    Negotiating,
    Connected,
    Failed,
    Closed,
}

/// One connection record: the publish session of the local participant or a
/// subscribe session for one remote stream. Owns the underlying media
/// transport; dropping the record via [`StreamConnection::close`] releases it.
pub struct StreamConnection {
    stream_id: StreamId,
    direction: Direction,
    state: NegotiationState,
    data_channel_open: bool,
    audio_enabled: bool,
    token: Option<String>,
    transport: Box<dyn MediaTransport>,
}

impl StreamConnection {
    pub fn new(
        stream_id: StreamId,
        direction: Direction,
        token: Option<String>,
        transport: Box<dyn MediaTransport>,
    ) -> Self {
        Self {
            stream_id,
            direction,
            state: NegotiationState::Idle,
            data_channel_open: false,
            audio_enabled: true,
            token,
            transport,
        }
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_data_channel_open(&self) -> bool {
        self.data_channel_open
    }

    /// Enter the negotiating state. Publish records initiate: they create the
    /// data channel (the offering side owns channel creation), produce the
    /// local offer and emit it as `takeConfiguration(offer)`. Subscribe
    /// records wait for the remote offer.
    pub async fn start_negotiation(
        &mut self,
        signaling: &dyn SignalingOutput,
        enable_data_channel: bool,
    ) -> Result<(), ConferenceError> {
        if self.direction == Direction::Publish {
            if enable_data_channel {
                self.transport
                    .create_data_channel()
                    .await
                    .map_err(|e| self.negotiation_error(e))?;
            }
            let sdp = self
                .transport
                .create_offer()
                .await
                .map_err(|e| self.negotiation_error(e))?;
            signaling
                .send(SignalMessage::configuration(
                    self.stream_id.clone(),
                    SdpKind::Offer,
                    sdp,
                    self.token.clone(),
                ))
                .await;
        }
        self.state = NegotiationState::Negotiating;
        Ok(())
    }

    /// Apply a remote description routed to this record. A remote offer is
    /// answered immediately; a remote answer leaves the record waiting for
    /// the transport to report connected.
    pub async fn handle_remote_description(
        &mut self,
        kind: SdpKind,
        sdp: String,
        signaling: &dyn SignalingOutput,
    ) -> Result<(), ConferenceError> {
        self.transport
            .set_remote_description(kind, sdp)
            .await
            .map_err(|e| self.negotiation_error(e))?;

        if kind == SdpKind::Offer {
            let answer = self
                .transport
                .create_answer()
                .await
                .map_err(|e| self.negotiation_error(e))?;
            signaling
                .send(SignalMessage::configuration(
                    self.stream_id.clone(),
                    SdpKind::Answer,
                    answer,
                    self.token.clone(),
                ))
                .await;
        }
        Ok(())
    }

    pub async fn handle_remote_candidate(
        &mut self,
        candidate: String,
        label: u32,
        id: String,
    ) -> Result<(), ConferenceError> {
        self.transport
            .add_remote_candidate(candidate, label, id)
            .await
            .map_err(|e| self.negotiation_error(e))
    }

    pub fn mark_connected(&mut self) {
        self.state = NegotiationState::Connected;
    }

    pub fn mark_failed(&mut self) {
        self.state = NegotiationState::Failed;
    }

    pub fn data_channel_opened(&mut self) {
        self.data_channel_open = true;
    }

    /// Send one already-encoded text frame over the data channel. Sends while
    /// the channel is not open are rejected, logged locally, and not surfaced
    /// to the remote peer.
    pub async fn send_payload(&self, text: String) -> bool {
        if !self.data_channel_open {
            warn!(
                "dropping data send for stream {}: data channel not open",
                self.stream_id
            );
            return false;
        }
        match self.transport.send_text(text).await {
            Ok(()) => true,
            Err(e) => {
                warn!("data send failed for stream {}: {e}", self.stream_id);
                false
            }
        }
    }

    pub fn toggle_audio(&mut self) {
        self.set_audio_enabled(!self.audio_enabled);
    }

    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
        self.transport.set_audio_enabled(enabled);
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    /// Terminal: releases the transport (and with it any media attachments).
    /// Reachable from every state.
    pub async fn close(&mut self) {
        if self.state == NegotiationState::Closed {
            return;
        }
        self.state = NegotiationState::Closed;
        self.data_channel_open = false;
        if let Err(e) = self.transport.close().await {
            debug!("transport close for stream {}: {e}", self.stream_id);
        }
    }

    fn negotiation_error(&self, source: anyhow::Error) -> ConferenceError {
        ConferenceError::Negotiation {
            stream_id: self.stream_id.to_string(),
            reason: source.to_string(),
        }
    }
}
