use crate::signaling::{SignalingEvent, SignalingOutput};
use async_trait::async_trait;
use chorus_core::{ConferenceError, SignalMessage};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};

/// One long-lived bidirectional text-frame websocket carrying JSON signaling
/// messages, one object per frame. The channel joins the room as soon as the
/// handshake completes and never reconnects by itself: transport failures are
/// surfaced as [`SignalingEvent::TransportError`] and recovery is left to the
/// caller.
#[derive(Clone)]
pub struct SignalingChannel {
    tx: mpsc::UnboundedSender<Message>,
}

impl SignalingChannel {
    /// Connect to `endpoint`, emit `Connected`, and immediately send the
    /// `joinRoom` command for `room_id`. An empty `preferred_stream_id`
    /// requests a server-assigned id.
    pub async fn connect(
        endpoint: &str,
        room_id: &str,
        preferred_stream_id: &str,
    ) -> Result<(Self, mpsc::Receiver<SignalingEvent>), ConferenceError> {
        let (socket, _response) = connect_async(endpoint)
            .await
            .map_err(|e| ConferenceError::Transport(format!("websocket connect failed: {e}")))?;
        debug!("signaling connected: {endpoint}");

        let (mut sink, mut stream) = socket.split();
        let (event_tx, event_rx) = mpsc::channel(256);
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let _ = event_tx.send(SignalingEvent::Connected).await;

        let join = SignalMessage::JoinRoom {
            room_id: room_id.to_string(),
            stream_id: preferred_stream_id.to_string(),
        };
        match serde_json::to_string(&join) {
            Ok(json) => {
                let _ = tx.send(Message::Text(json.into()));
            }
            Err(e) => error!("failed to serialize joinRoom: {e}"),
        }

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if sink.send(msg).await.is_err() {
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<SignalMessage>(text.as_str()) {
                            Ok(msg) => {
                                if event_tx.send(SignalingEvent::Message(msg)).await.is_err() {
                                    break;
                                }
                            }
                            // Malformed JSON is non-fatal: drop the frame,
                            // keep the session.
                            Err(e) => warn!("dropping malformed signaling frame: {e}"),
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by server".to_string());
                        let _ = event_tx.send(SignalingEvent::Disconnected(reason)).await;
                        return;
                    }
                    Ok(_) => {} // binary/ping/pong frames are not part of the protocol
                    Err(e) => {
                        let _ = event_tx
                            .send(SignalingEvent::TransportError(e.to_string()))
                            .await;
                        return;
                    }
                }
            }
            let _ = event_tx
                .send(SignalingEvent::Disconnected("stream ended".to_string()))
                .await;
        });

        Ok((Self { tx }, event_rx))
    }
}

#[async_trait]
impl SignalingOutput for SignalingChannel {
    async fn send(&self, msg: SignalMessage) {
        match serde_json::to_string(&msg) {
            Ok(json) => {
                if self.tx.send(Message::Text(json.into())).is_err() {
                    warn!("signaling send after channel closed: {msg:?}");
                }
            }
            Err(e) => error!("failed to serialize signaling message: {e}"),
        }
    }

    async fn disconnect(&self) {
        let _ = self.tx.send(Message::Close(None));
    }
}
