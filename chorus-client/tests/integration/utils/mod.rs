pub mod mock_transport;

pub use mock_signaling::*;
pub use mock_transport::*;

use chorus_client::{
    ConferenceConfig, ConferenceEvent, ConferenceHandle, ConferenceSession, SignalingEvent,
};
use chorus_core::{Role, SignalMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout};
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A conference session wired to mocks on both seams: signaling frames go in
/// through `frames`, outbound commands land in `signaling`, and every media
/// transport the session creates is observable through `factory`.
pub struct TestSession {
    pub frames: mpsc::Sender<SignalingEvent>,
    pub signaling: MockSignalingOutput,
    pub factory: MockTransportFactory,
    pub handle: ConferenceHandle,
    pub events: mpsc::Receiver<ConferenceEvent>,
    pub ops: OpLog,
}

/// Config with the stats poller effectively parked, so tests that are not
/// about polling never race it.
pub fn test_config(role: Role) -> ConferenceConfig {
    let mut config = ConferenceConfig::new("ws://127.0.0.1:1/Conference/websocket", "room1", role);
    config.stats_interval = Duration::from_secs(3600);
    config
}

pub fn start_session(config: ConferenceConfig) -> TestSession {
    init_tracing();

    let ops = OpLog::default();
    let (frames, signal_rx) = mpsc::channel(64);
    let signaling = MockSignalingOutput::new(ops.clone());
    let factory = MockTransportFactory::new(ops.clone());

    let (session, handle, events) = ConferenceSession::new(
        config,
        Arc::new(signaling.clone()),
        signal_rx,
        Arc::new(factory.clone()),
    );
    tokio::spawn(session.run());

    TestSession {
        frames,
        signaling,
        factory,
        handle,
        events,
        ops,
    }
}

impl TestSession {
    /// Inject one server frame, exactly as the websocket reader would.
    pub async fn feed(&self, frame: &str) {
        let msg: SignalMessage = serde_json::from_str(frame).expect("test frame must parse");
        self.frames
            .send(SignalingEvent::Message(msg))
            .await
            .expect("session loop should be running");
    }

    /// Deliver the `joinedRoom` confirmation assigning `my_id`.
    pub async fn join_as(&self, my_id: &str, streams: &[&str]) {
        let streams = serde_json::to_string(streams).unwrap();
        self.feed(&format!(
            r#"{{"command":"notification","definition":"joinedRoom","streamId":"{my_id}","streams":{streams}}}"#
        ))
        .await;
    }

    /// Deliver a `roomInformation` membership refresh.
    pub async fn room_info(&self, streams: &[&str]) {
        let streams = serde_json::to_string(streams).unwrap();
        self.feed(&format!(
            r#"{{"command":"roomInformation","streams":{streams}}}"#
        ))
        .await;
    }

    pub async fn next_event(&mut self) -> ConferenceEvent {
        timeout(Duration::from_secs(2), self.events.recv())
            .await
            .expect("timed out waiting for a conference event")
            .expect("event channel closed")
    }

    /// Assert that no event arrives within the window.
    pub async fn expect_no_event(&mut self, window_ms: u64) {
        let result = timeout(Duration::from_millis(window_ms), self.events.recv()).await;
        assert!(result.is_err(), "unexpected event: {:?}", result.unwrap());
    }
}

/// Poll `cond` until it holds or the timeout elapses.
pub async fn wait_until<F: Fn() -> bool>(cond: F, timeout_ms: u64) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
