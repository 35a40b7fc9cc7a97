use crate::transport::{MediaTransport, TransportEvent, TransportFactory};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use chorus_core::{ConferenceError, Direction, IceServerConfig, SdpKind, StreamId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const DATA_CHANNEL_LABEL: &str = "data";
const LOCAL_MEDIA_STREAM_ID: &str = "chorus";

/// Media transport factory backed by the `webrtc` crate. Constructed once,
/// owned by the conference session, and asked for one peer connection per
/// stream record.
pub struct WebRtcFactory {
    ice_servers: Vec<IceServerConfig>,
}

impl WebRtcFactory {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        let ice_servers = self
            .ice_servers
            .iter()
            .map(|s| RTCIceServer {
                urls: s.urls.clone(),
                username: s.username.clone().unwrap_or_default(),
                credential: s.credential.clone().unwrap_or_default(),
            })
            .collect();
        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }
}

#[async_trait]
impl TransportFactory for WebRtcFactory {
    async fn create(
        &self,
        stream_id: StreamId,
        direction: Direction,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn MediaTransport>, ConferenceError> {
        let transport = WebRtcTransport::new(stream_id.clone(), self.rtc_configuration(), events)
            .await
            .map_err(|e| ConferenceError::Negotiation {
                stream_id: stream_id.to_string(),
                reason: format!("transport setup failed: {e}"),
            })?;

        if direction == Direction::Publish {
            transport
                .attach_local_media()
                .await
                .map_err(|e| ConferenceError::MediaUnavailable(e.to_string()))?;
        }

        Ok(Box::new(transport))
    }
}

struct WebRtcTransport {
    stream_id: StreamId,
    peer_connection: Arc<RTCPeerConnection>,
    data_channel: Arc<Mutex<Option<Arc<RTCDataChannel>>>>,
    events: mpsc::Sender<TransportEvent>,
    audio_enabled: AtomicBool,
}

impl WebRtcTransport {
    async fn new(
        stream_id: StreamId,
        config: RTCConfiguration,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let peer_connection = Arc::new(api.new_peer_connection(config).await?);

        let state_tx = events.clone();
        let sid_state = stream_id.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let sid = sid_state.clone();
                Box::pin(async move {
                    info!("connection state for stream {sid}: {state:?}");
                    match state {
                        RTCPeerConnectionState::Connected => {
                            let _ = tx.send(TransportEvent::Connected(sid)).await;
                        }
                        RTCPeerConnectionState::Failed => {
                            let _ = tx.send(TransportEvent::Failed(sid)).await;
                        }
                        RTCPeerConnectionState::Disconnected | RTCPeerConnectionState::Closed => {
                            let _ = tx.send(TransportEvent::Disconnected(sid)).await;
                        }
                        _ => {}
                    }
                })
            },
        ));

        // Trickle ICE: candidates go out the moment they are gathered. The
        // remote side buffers any that arrive before its remote description.
        let ice_tx = events.clone();
        let sid_ice = stream_id.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let sid = sid_ice.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(TransportEvent::LocalCandidate {
                        stream_id: sid,
                        candidate: init.candidate,
                        label: u32::from(init.sdp_mline_index.unwrap_or(0)),
                        id: init.sdp_mid.unwrap_or_default(),
                    })
                    .await;
            })
        }));

        let data_channel: Arc<Mutex<Option<Arc<RTCDataChannel>>>> = Arc::new(Mutex::new(None));

        // The offering side creates the channel; the answering side receives
        // it here. Either way the same wiring applies.
        let dc_slot = Arc::clone(&data_channel);
        let dc_tx = events.clone();
        let sid_dc = stream_id.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let slot = Arc::clone(&dc_slot);
            let tx = dc_tx.clone();
            let sid = sid_dc.clone();
            Box::pin(async move {
                debug!("data channel '{}' arrived for stream {sid}", dc.label());
                wire_data_channel(sid, &dc, tx);
                *slot.lock().await = Some(dc);
            })
        }));

        Ok(Self {
            stream_id,
            peer_connection,
            data_channel,
            events,
            audio_enabled: AtomicBool::new(true),
        })
    }

    /// Attach local capture tracks for a publish connection. The sample
    /// sources feeding these tracks live in the capture layer outside this
    /// crate.
    async fn attach_local_media(&self) -> Result<()> {
        let audio_track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_string(),
                ..Default::default()
            },
            "audio".to_string(),
            LOCAL_MEDIA_STREAM_ID.to_string(),
        ));
        self.peer_connection
            .add_track(Arc::clone(&audio_track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .context("failed to attach local audio track")?;

        let video_track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_string(),
                ..Default::default()
            },
            "video".to_string(),
            LOCAL_MEDIA_STREAM_ID.to_string(),
        ));
        self.peer_connection
            .add_track(Arc::clone(&video_track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .context("failed to attach local video track")?;

        Ok(())
    }
}

/// Wire `label` values are tiny m-line indexes; anything that does not fit in
/// the engine's u16 is passed as absent rather than truncated.
fn mline_index(label: u32) -> Option<u16> {
    u16::try_from(label).ok()
}

fn wire_data_channel(
    stream_id: StreamId,
    dc: &Arc<RTCDataChannel>,
    events: mpsc::Sender<TransportEvent>,
) {
    let open_tx = events.clone();
    let sid_open = stream_id.clone();
    dc.on_open(Box::new(move || {
        let tx = open_tx.clone();
        let sid = sid_open.clone();
        Box::pin(async move {
            info!("data channel open for stream {sid}");
            let _ = tx.send(TransportEvent::DataChannelOpen(sid)).await;
        })
    }));

    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = events.clone();
        let sid = stream_id.clone();
        Box::pin(async move {
            let bytes = Bytes::from(msg.data.to_vec());
            let _ = tx
                .send(TransportEvent::DataChannelMessage(sid, bytes))
                .await;
        })
    }));
}

#[async_trait]
impl MediaTransport for WebRtcTransport {
    async fn create_data_channel(&self) -> Result<()> {
        let dc = self
            .peer_connection
            .create_data_channel(DATA_CHANNEL_LABEL, None)
            .await
            .context("failed to create data channel")?;
        wire_data_channel(self.stream_id.clone(), &dc, self.events.clone());
        *self.data_channel.lock().await = Some(dc);
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .context("failed to create offer")?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await
            .context("failed to set local offer")?;
        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("failed to create answer")?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await
            .context("failed to set local answer")?;
        Ok(answer.sdp)
    }

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        let description = match kind {
            SdpKind::Offer => RTCSessionDescription::offer(sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(sdp)?,
        };
        self.peer_connection
            .set_remote_description(description)
            .await
            .context("failed to set remote description")?;
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: String, label: u32, id: String) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate,
            sdp_mid: if id.is_empty() { None } else { Some(id) },
            sdp_mline_index: mline_index(label),
            username_fragment: None,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .context("failed to add remote candidate")?;
        Ok(())
    }

    async fn send_text(&self, text: String) -> Result<()> {
        let guard = self.data_channel.lock().await;
        let Some(dc) = guard.as_ref() else {
            bail!("no data channel for stream {}", self.stream_id);
        };
        if dc.ready_state() != RTCDataChannelState::Open {
            bail!(
                "data channel for stream {} is {:?}, not open",
                self.stream_id,
                dc.ready_state()
            );
        }
        dc.send_text(text).await.context("data channel send")?;
        Ok(())
    }

    fn set_audio_enabled(&self, enabled: bool) {
        // The capture/playout layer owns the actual samples and consults this
        // gate; the negotiated session itself stays up.
        self.audio_enabled.store(enabled, Ordering::Relaxed);
        debug!(
            "audio {} for stream {}",
            if enabled { "enabled" } else { "disabled" },
            self.stream_id
        );
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection
            .close()
            .await
            .context("failed to close peer connection")?;
        Ok(())
    }
}
