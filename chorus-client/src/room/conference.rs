use crate::config::ConferenceConfig;
use crate::connection::StreamConnection;
use crate::room::{ConferenceCommand, ConferenceEvent, Room};
use crate::signaling::{SignalingChannel, SignalingEvent, SignalingOutput};
use crate::stats::{fetch_listener_count, stats_endpoint};
use crate::transport::{TransportEvent, TransportFactory, WebRtcFactory};
use bytes::Bytes;
use chorus_core::{
    ConferenceError, Direction, SignalMessage, StreamId, encode_payload, encode_raw, notification,
    server_error_message,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Cloneable command handle for a running conference session. Every
/// operation is dispatched into the session loop; nothing mutates shared
/// state from the caller's task.
#[derive(Clone)]
pub struct ConferenceHandle {
    tx: mpsc::Sender<ConferenceCommand>,
}

impl ConferenceHandle {
    async fn command(&self, cmd: ConferenceCommand) -> Result<(), ConferenceError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| ConferenceError::Transport("conference session has stopped".to_string()))
    }

    pub async fn toggle_local_audio(&self) -> Result<(), ConferenceError> {
        self.command(ConferenceCommand::ToggleLocalAudio).await
    }

    pub async fn mute_incoming_audio(&self) -> Result<(), ConferenceError> {
        self.command(ConferenceCommand::MuteIncomingAudio).await
    }

    pub async fn disable_first_incoming_audio(&self) -> Result<(), ConferenceError> {
        self.command(ConferenceCommand::DisableFirstIncomingAudio)
            .await
    }

    /// Send raw application JSON bytes over the publish record's channel.
    pub async fn broadcast(&self, payload: Bytes) -> Result<(), ConferenceError> {
        self.command(ConferenceCommand::Broadcast(payload)).await
    }

    /// Send raw application JSON bytes over the first subscribe record's
    /// channel (single-listener reply convention).
    pub async fn reply(&self, payload: Bytes) -> Result<(), ConferenceError> {
        self.command(ConferenceCommand::Reply(payload)).await
    }

    pub async fn send_file(
        &self,
        message: chorus_core::PresenterMessage,
    ) -> Result<(), ConferenceError> {
        self.command(ConferenceCommand::SendFile(message)).await
    }

    pub async fn send_message(
        &self,
        message: chorus_core::ListenerMessage,
    ) -> Result<(), ConferenceError> {
        self.command(ConferenceCommand::SendMessage(message)).await
    }

    pub async fn send_audio_info(
        &self,
        info: chorus_core::AudioInfo,
    ) -> Result<(), ConferenceError> {
        self.command(ConferenceCommand::SendAudioInfo(info)).await
    }

    pub async fn request_credentials(
        &self,
        request: chorus_core::CredentialsRequest,
    ) -> Result<(), ConferenceError> {
        self.command(ConferenceCommand::RequestCredentials(request))
            .await
    }

    pub async fn leave(&self) -> Result<(), ConferenceError> {
        self.command(ConferenceCommand::Leave).await
    }
}

/// Connect to the room described by `config` and spawn its session loop.
pub async fn connect(
    config: ConferenceConfig,
) -> Result<(ConferenceHandle, mpsc::Receiver<ConferenceEvent>), ConferenceError> {
    let (channel, signal_rx) = SignalingChannel::connect(
        config.signaling_endpoint(),
        &config.room_id,
        &config.preferred_stream_id,
    )
    .await?;
    let factory = Arc::new(WebRtcFactory::new(config.ice_servers.clone()));
    let (session, handle, events) =
        ConferenceSession::new(config, Arc::new(channel), signal_rx, factory);
    tokio::spawn(session.run());
    Ok((handle, events))
}

/// The conference orchestrator: owns the room, the signaling seam, the
/// transport factory and the per-stream connection records. One
/// `tokio::select!` loop serializes every mutation: signaling events,
/// transport callbacks, stats results, timer ticks and caller commands all
/// funnel through it.
pub struct ConferenceSession {
    config: ConferenceConfig,
    room: Room,
    signaling: Arc<dyn SignalingOutput>,
    factory: Arc<dyn TransportFactory>,
    connections: HashMap<StreamId, StreamConnection>,
    /// Subscribe records in creation order; the head is the reply/mute
    /// target of the first-listener conventions.
    subscribe_order: Vec<StreamId>,
    publish_id: Option<StreamId>,
    signal_rx: mpsc::Receiver<SignalingEvent>,
    command_rx: mpsc::Receiver<ConferenceCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    stats_rx: mpsc::Receiver<u32>,
    stats_tx: mpsc::Sender<u32>,
    stats_in_flight: bool,
    http: reqwest::Client,
    events: mpsc::Sender<ConferenceEvent>,
}

impl ConferenceSession {
    pub fn new(
        config: ConferenceConfig,
        signaling: Arc<dyn SignalingOutput>,
        signal_rx: mpsc::Receiver<SignalingEvent>,
        factory: Arc<dyn TransportFactory>,
    ) -> (
        Self,
        ConferenceHandle,
        mpsc::Receiver<ConferenceEvent>,
    ) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (stats_tx, stats_rx) = mpsc::channel(8);
        let (event_tx, event_rx) = mpsc::channel(256);

        let room = Room::new(config.room_id.clone());
        let session = Self {
            config,
            room,
            signaling,
            factory,
            connections: HashMap::new(),
            subscribe_order: Vec::new(),
            publish_id: None,
            signal_rx,
            command_rx,
            transport_rx,
            transport_tx,
            stats_rx,
            stats_tx,
            stats_in_flight: false,
            http: reqwest::Client::new(),
            events: event_tx,
        };
        (session, ConferenceHandle { tx: command_tx }, event_rx)
    }

    pub async fn run(mut self) {
        info!("conference session started for room {}", self.room.room_id());

        let mut ticker = tokio::time::interval(self.config.stats_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => {
                        if self.handle_command(cmd).await {
                            break;
                        }
                    }
                    // every handle dropped: same teardown as an explicit leave
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                Some(event) = self.signal_rx.recv() => self.handle_signaling_event(event).await,
                Some(event) = self.transport_rx.recv() => self.handle_transport_event(event).await,
                Some(count) = self.stats_rx.recv() => self.handle_listener_count(count).await,
                _ = ticker.tick() => self.poll_stats(),
            }
        }

        info!("conference session finished");
    }

    async fn handle_signaling_event(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Connected => debug!("signaling channel connected"),
            SignalingEvent::Message(msg) => self.handle_signal_message(msg).await,
            SignalingEvent::Disconnected(reason) => {
                // No automatic reconnection; the caller decides how to recover.
                warn!("signaling channel disconnected: {reason}");
                let _ = self
                    .events
                    .send(ConferenceEvent::SignalingDisconnected { reason })
                    .await;
            }
            SignalingEvent::TransportError(reason) => {
                warn!("signaling transport error: {reason}");
                let _ = self
                    .events
                    .send(ConferenceEvent::SignalingError { reason })
                    .await;
            }
        }
    }

    async fn handle_signal_message(&mut self, msg: SignalMessage) {
        match msg {
            SignalMessage::Notification {
                definition,
                stream_id,
                streams,
            } if definition == notification::JOINED_ROOM => {
                let Some(my_id) = stream_id else {
                    warn!("joinedRoom notification without a stream id");
                    return;
                };
                info!("joined room {} as stream {my_id}", self.room.room_id());
                let joined = self
                    .room
                    .apply_joined_room(my_id.clone(), streams.unwrap_or_default());
                if self.config.role.publishes() {
                    self.open_publish(my_id).await;
                }
                for id in joined {
                    self.open_subscribe(id).await;
                }
            }

            SignalMessage::Notification { definition, .. } => {
                debug!("unhandled notification: {definition}");
            }

            SignalMessage::RoomInformation { streams } => {
                let diff = self.room.apply_room_info(streams);
                // joins before leaves, both applied in full before the next
                // refresh can be issued
                for id in diff.joined {
                    self.open_subscribe(id).await;
                }
                for id in diff.left {
                    self.close_stream(&id, true).await;
                }
            }

            SignalMessage::TakeConfiguration {
                stream_id,
                sdp_type,
                sdp,
                ..
            } => {
                let Some(conn) = self.connections.get_mut(&stream_id) else {
                    debug!("remote description for unknown stream {stream_id}, dropped");
                    return;
                };
                if let Err(e) = conn
                    .handle_remote_description(sdp_type, sdp, self.signaling.as_ref())
                    .await
                {
                    self.fail_stream(&stream_id, e.to_string()).await;
                }
            }

            SignalMessage::TakeCandidate {
                stream_id,
                candidate,
                label,
                id,
                ..
            } => {
                // Candidates never create records.
                let Some(conn) = self.connections.get_mut(&stream_id) else {
                    debug!("candidate for unknown stream {stream_id}, dropped");
                    return;
                };
                if let Err(e) = conn.handle_remote_candidate(candidate, label, id).await {
                    warn!("failed to apply candidate for stream {stream_id}: {e}");
                }
            }

            SignalMessage::Error { definition } => {
                let message = server_error_message(&definition);
                warn!("server error: {message}");
                let _ = self
                    .events
                    .send(ConferenceEvent::ServerError { message })
                    .await;
            }

            SignalMessage::JoinRoom { .. }
            | SignalMessage::LeaveRoom { .. }
            | SignalMessage::GetRoomInfo { .. } => {
                debug!("ignoring client-bound command echoed by server");
            }

            SignalMessage::Unknown => debug!("ignoring unknown signaling command"),
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::LocalCandidate {
                stream_id,
                candidate,
                label,
                id,
            } => {
                self.signaling
                    .send(SignalMessage::candidate(stream_id, candidate, label, id))
                    .await;
            }
            TransportEvent::Connected(stream_id) => {
                if let Some(conn) = self.connections.get_mut(&stream_id) {
                    conn.mark_connected();
                    let _ = self
                        .events
                        .send(ConferenceEvent::StreamConnected(stream_id))
                        .await;
                }
            }
            TransportEvent::Failed(stream_id) => {
                let Some(conn) = self.connections.get_mut(&stream_id) else {
                    return;
                };
                conn.mark_failed();
                self.fail_stream(&stream_id, "transport reported failure".to_string())
                    .await;
            }
            TransportEvent::Disconnected(stream_id) => {
                // Deliberately closed records are already gone from the map;
                // anything still here is a remote hangup.
                self.close_stream(&stream_id, true).await;
            }
            TransportEvent::DataChannelOpen(stream_id) => {
                if let Some(conn) = self.connections.get_mut(&stream_id) {
                    conn.data_channel_opened();
                }
            }
            TransportEvent::DataChannelMessage(stream_id, bytes) => {
                match chorus_core::decode_payload(&bytes) {
                    Ok(data) => {
                        let _ = self
                            .events
                            .send(ConferenceEvent::DataReceived {
                                stream_id,
                                data: Bytes::from(data),
                            })
                            .await;
                    }
                    Err(e) => warn!("dropping undecodable data frame from {stream_id}: {e}"),
                }
            }
        }
    }

    /// Dispatch one caller command. Returns `true` when the command ends the
    /// session and the loop should stop.
    async fn handle_command(&mut self, cmd: ConferenceCommand) -> bool {
        match cmd {
            ConferenceCommand::ToggleLocalAudio => {
                if let Some(id) = self.publish_id.clone() {
                    if let Some(conn) = self.connections.get_mut(&id) {
                        conn.toggle_audio();
                    }
                }
            }
            ConferenceCommand::MuteIncomingAudio => {
                for id in self.subscribe_order.clone() {
                    if let Some(conn) = self.connections.get_mut(&id) {
                        conn.set_audio_enabled(false);
                    }
                }
            }
            ConferenceCommand::DisableFirstIncomingAudio => {
                // First record only; later records keep their audio.
                if let Some(id) = self.subscribe_order.first().cloned() {
                    if let Some(conn) = self.connections.get_mut(&id) {
                        conn.set_audio_enabled(false);
                    }
                }
            }
            ConferenceCommand::Broadcast(payload) => {
                self.send_via_publish(encode_raw(&payload)).await;
            }
            ConferenceCommand::Reply(payload) => {
                self.send_via_first_subscribe(encode_raw(&payload)).await;
            }
            ConferenceCommand::SendFile(message) => self.broadcast_typed(&message).await,
            ConferenceCommand::SendAudioInfo(info) => self.broadcast_typed(&info).await,
            ConferenceCommand::SendMessage(message) => self.reply_typed(&message).await,
            ConferenceCommand::RequestCredentials(request) => self.reply_typed(&request).await,
            ConferenceCommand::Leave => {
                self.teardown().await;
                return true;
            }
        }
        false
    }

    async fn broadcast_typed<T: Serialize>(&mut self, payload: &T) {
        match encode_payload(payload) {
            Ok(frame) => self.send_via_publish(frame).await,
            Err(e) => warn!("failed to encode broadcast payload: {e}"),
        }
    }

    async fn reply_typed<T: Serialize>(&mut self, payload: &T) {
        match encode_payload(payload) {
            Ok(frame) => self.send_via_first_subscribe(frame).await,
            Err(e) => warn!("failed to encode reply payload: {e}"),
        }
    }

    async fn send_via_publish(&self, frame: String) {
        let Some(id) = &self.publish_id else {
            warn!("broadcast requested without a publish record");
            return;
        };
        if let Some(conn) = self.connections.get(id) {
            conn.send_payload(frame).await;
        }
    }

    async fn send_via_first_subscribe(&self, frame: String) {
        // Single-listener reply convention: only the first subscribe record
        // is addressed.
        let Some(id) = self.subscribe_order.first() else {
            warn!("reply requested without a subscribe record");
            return;
        };
        if let Some(conn) = self.connections.get(id) {
            conn.send_payload(frame).await;
        }
    }

    async fn open_publish(&mut self, stream_id: StreamId) {
        if self.publish_id.is_some() {
            warn!("publish record already exists, ignoring {stream_id}");
            return;
        }
        if let Some(conn) = self.open_record(stream_id.clone(), Direction::Publish).await {
            self.publish_id = Some(stream_id.clone());
            self.connections.insert(stream_id, conn);
        }
    }

    async fn open_subscribe(&mut self, stream_id: StreamId) {
        if self.connections.contains_key(&stream_id) {
            debug!("record for stream {stream_id} already exists");
            return;
        }
        if let Some(conn) = self
            .open_record(stream_id.clone(), Direction::Subscribe)
            .await
        {
            self.subscribe_order.push(stream_id.clone());
            self.connections.insert(stream_id, conn);
        }
    }

    async fn open_record(
        &mut self,
        stream_id: StreamId,
        direction: Direction,
    ) -> Option<StreamConnection> {
        let transport = match self
            .factory
            .create(stream_id.clone(), direction, self.transport_tx.clone())
            .await
        {
            Ok(t) => t,
            Err(e) => {
                let _ = self
                    .events
                    .send(ConferenceEvent::StreamFailed {
                        stream_id,
                        reason: e.to_string(),
                    })
                    .await;
                return None;
            }
        };

        let mut conn = StreamConnection::new(
            stream_id.clone(),
            direction,
            self.config.token.clone(),
            transport,
        );
        if let Err(e) = conn
            .start_negotiation(self.signaling.as_ref(), self.config.enable_data_channel)
            .await
        {
            conn.close().await;
            let _ = self
                .events
                .send(ConferenceEvent::StreamFailed {
                    stream_id,
                    reason: e.to_string(),
                })
                .await;
            return None;
        }
        Some(conn)
    }

    async fn close_stream(&mut self, stream_id: &StreamId, emit: bool) {
        let Some(mut conn) = self.connections.remove(stream_id) else {
            return;
        };
        conn.close().await;
        self.subscribe_order.retain(|id| id != stream_id);
        if self.publish_id.as_ref() == Some(stream_id) {
            self.publish_id = None;
        }
        if emit {
            let _ = self
                .events
                .send(ConferenceEvent::StreamDisconnected(stream_id.clone()))
                .await;
        }
    }

    /// Failure is terminal for the record: reported, then closed. Other
    /// records and the room itself are untouched.
    async fn fail_stream(&mut self, stream_id: &StreamId, reason: String) {
        let _ = self
            .events
            .send(ConferenceEvent::StreamFailed {
                stream_id: stream_id.clone(),
                reason,
            })
            .await;
        self.close_stream(stream_id, false).await;
    }

    /// Poller tick. Dormant until the session has joined; one request in
    /// flight at most, so refresh cycles never overlap.
    fn poll_stats(&mut self) {
        if self.stats_in_flight {
            return;
        }
        let Some(stream_id) = self.room.my_stream_id() else {
            return;
        };
        self.stats_in_flight = true;

        let url = stats_endpoint(self.config.signaling_endpoint(), stream_id);
        let client = self.http.clone();
        let tx = self.stats_tx.clone();
        tokio::spawn(async move {
            let count = fetch_listener_count(&client, &url).await;
            // After teardown the receiver is gone and a late result is
            // simply discarded.
            let _ = tx.send(count).await;
        });
    }

    /// Each completed poll feeds two consumers in lockstep: the listener
    /// count observer (publishing role only) and the membership refresh.
    async fn handle_listener_count(&mut self, count: u32) {
        self.stats_in_flight = false;
        if self.config.role.publishes() {
            let _ = self.events.send(ConferenceEvent::ListenerCount(count)).await;
        }
        if let Some(stream_id) = self.room.my_stream_id() {
            self.signaling
                .send(SignalMessage::GetRoomInfo {
                    room_id: self.room.room_id().to_string(),
                    stream_id: stream_id.to_string(),
                })
                .await;
        }
    }

    /// Ordered teardown: every record closes before `leaveRoom` goes out, the
    /// channel disconnects after the send, and only then is local state
    /// cleared, so no in-flight record references a channel that is gone.
    async fn teardown(&mut self) {
        for conn in self.connections.values_mut() {
            conn.close().await;
        }
        self.signaling
            .send(SignalMessage::LeaveRoom {
                room_id: self.room.room_id().to_string(),
                stream_id: self
                    .room
                    .my_stream_id()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            })
            .await;
        self.signaling.disconnect().await;
        self.connections.clear();
        self.subscribe_order.clear();
        self.publish_id = None;
        self.room.clear();
        let _ = self.events.send(ConferenceEvent::Closed).await;
    }
}
