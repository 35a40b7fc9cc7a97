use crate::utils::{MockOp, OpLog};
use anyhow::Result;
use async_trait::async_trait;
use chorus_client::{MediaTransport, TransportEvent, TransportFactory};
use chorus_core::{ConferenceError, Direction, SdpKind, StreamId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    CreateDataChannel,
    CreateOffer,
    CreateAnswer,
    SetRemoteDescription(SdpKind),
    AddRemoteCandidate(String),
    SendText(String),
    SetAudioEnabled(bool),
    Close,
}

/// Test-side view of one created transport: its recorded calls plus the event
/// sender the session handed to the factory, so tests can fire transport
/// events into the loop.
#[derive(Clone)]
pub struct TransportProbe {
    pub stream_id: StreamId,
    pub direction: Direction,
    calls: Arc<Mutex<Vec<TransportCall>>>,
    events: mpsc::Sender<TransportEvent>,
}

impl TransportProbe {
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::SendText(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn was_closed(&self) -> bool {
        self.calls().contains(&TransportCall::Close)
    }

    pub fn audio_calls(&self) -> Vec<bool> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::SetAudioEnabled(enabled) => Some(enabled),
                _ => None,
            })
            .collect()
    }

    pub async fn fire(&self, event: TransportEvent) {
        self.events
            .send(event)
            .await
            .expect("session loop should be running");
    }
}

struct MockTransport {
    stream_id: StreamId,
    calls: Arc<Mutex<Vec<TransportCall>>>,
    ops: OpLog,
}

impl MockTransport {
    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MediaTransport for MockTransport {
    async fn create_data_channel(&self) -> Result<()> {
        self.record(TransportCall::CreateDataChannel);
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        self.record(TransportCall::CreateOffer);
        Ok(format!("offer-sdp-{}", self.stream_id))
    }

    async fn create_answer(&self) -> Result<String> {
        self.record(TransportCall::CreateAnswer);
        Ok(format!("answer-sdp-{}", self.stream_id))
    }

    async fn set_remote_description(&self, kind: SdpKind, _sdp: String) -> Result<()> {
        self.record(TransportCall::SetRemoteDescription(kind));
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: String, _label: u32, _id: String) -> Result<()> {
        self.record(TransportCall::AddRemoteCandidate(candidate));
        Ok(())
    }

    async fn send_text(&self, text: String) -> Result<()> {
        self.record(TransportCall::SendText(text));
        Ok(())
    }

    fn set_audio_enabled(&self, enabled: bool) {
        self.record(TransportCall::SetAudioEnabled(enabled));
    }

    async fn close(&self) -> Result<()> {
        self.record(TransportCall::Close);
        self.ops
            .push(MockOp::TransportClosed(self.stream_id.to_string()));
        Ok(())
    }
}

/// Factory that hands out recording transports and keeps a probe for each.
#[derive(Clone)]
pub struct MockTransportFactory {
    probes: Arc<Mutex<Vec<TransportProbe>>>,
    fail_next: Arc<AtomicBool>,
    ops: OpLog,
}

impl MockTransportFactory {
    pub fn new(ops: OpLog) -> Self {
        Self {
            probes: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(AtomicBool::new(false)),
            ops,
        }
    }

    pub fn probes(&self) -> Vec<TransportProbe> {
        self.probes.lock().unwrap().clone()
    }

    pub fn probe(&self, stream_id: &str) -> Option<TransportProbe> {
        self.probes()
            .into_iter()
            .find(|p| p.stream_id.as_str() == stream_id)
    }

    pub fn create_count(&self) -> usize {
        self.probes.lock().unwrap().len()
    }

    /// Make the next `create` call fail.
    pub fn fail_next_create(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Poll until the session has created a transport for `stream_id`.
    pub async fn wait_for_probe(&self, stream_id: &str, timeout_ms: u64) -> TransportProbe {
        let ok = super::wait_until(|| self.probe(stream_id).is_some(), timeout_ms).await;
        assert!(ok, "no transport was created for stream {stream_id}");
        self.probe(stream_id).unwrap()
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn create(
        &self,
        stream_id: StreamId,
        direction: Direction,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn MediaTransport>, ConferenceError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ConferenceError::Negotiation {
                stream_id: stream_id.to_string(),
                reason: "injected create failure".to_string(),
            });
        }

        let calls = Arc::new(Mutex::new(Vec::new()));
        let probe = TransportProbe {
            stream_id: stream_id.clone(),
            direction,
            calls: calls.clone(),
            events,
        };
        self.probes.lock().unwrap().push(probe);

        Ok(Box::new(MockTransport {
            stream_id,
            calls,
            ops: self.ops.clone(),
        }))
    }
}
