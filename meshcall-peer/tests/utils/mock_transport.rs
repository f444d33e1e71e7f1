use async_trait::async_trait;
use meshcall_core::ParticipantId;
use meshcall_peer::{LocalCapture, PeerTransport, RemoteTrack, SessionKey, TransportEvent, TransportFactory};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// Calls a session made on its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Created { tracks: Vec<String> },
    CreateOffer { ice_restart: bool },
    ApplyOffer { sdp: String },
    CreateAnswer,
    ApplyAnswer { sdp: String },
    AddCandidate { candidate: String },
    ReplaceTracks { tracks: Vec<String> },
    Close,
}

#[derive(Default)]
struct MockInner {
    calls: Mutex<Vec<(SessionKey, TransportCall)>>,
    /// Latest session per participant, with the room's event sender.
    sessions: Mutex<HashMap<ParticipantId, (SessionKey, mpsc::Sender<TransportEvent>)>>,
    fail_next_create: AtomicBool,
}

impl MockInner {
    fn record(&self, key: &SessionKey, call: TransportCall) {
        tracing::debug!("[MockTransport] {} {:?}", key, call);
        self.calls.lock().unwrap().push((key.clone(), call));
    }
}

/// TransportFactory whose transports record every call and let the test drive
/// state changes, local candidates and remote tracks.
#[derive(Clone, Default)]
pub struct MockTransportFactory {
    inner: Arc<MockInner>,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `create` fail.
    pub fn fail_next_create(&self) {
        self.inner.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// Calls on every transport created for `participant_id`, oldest first.
    pub fn calls_for(&self, participant_id: &str) -> Vec<TransportCall> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.participant_id.as_str() == participant_id)
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn calls_for_session(&self, key: &SessionKey) -> Vec<TransportCall> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn created_count(&self, participant_id: &str) -> usize {
        self.calls_for(participant_id)
            .iter()
            .filter(|c| matches!(c, TransportCall::Created { .. }))
            .count()
    }

    /// Polls until `participant_id`'s transports received `call`.
    pub async fn wait_for_call(&self, participant_id: &str, call: &TransportCall, timeout_ms: u64) -> bool {
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);

        loop {
            if self.calls_for(participant_id).contains(call) {
                return true;
            }
            if tokio::time::Instant::now() > deadline {
                return false;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    pub fn session_key(&self, participant_id: &str) -> Option<SessionKey> {
        self.inner
            .sessions
            .lock()
            .unwrap()
            .get(&ParticipantId::from(participant_id))
            .map(|(key, _)| key.clone())
    }

    pub async fn emit_state(&self, participant_id: &str, state: RTCPeerConnectionState) {
        let Some(key) = self.session_key(participant_id) else {
            panic!("no transport for {participant_id}");
        };
        self.emit(TransportEvent::StateChanged(key, state)).await;
    }

    pub async fn emit_candidate(&self, participant_id: &str, candidate: &str) {
        let Some(key) = self.session_key(participant_id) else {
            panic!("no transport for {participant_id}");
        };
        self.emit(TransportEvent::CandidateGathered(key, candidate.to_owned()))
            .await;
    }

    pub async fn emit_track(&self, participant_id: &str, track: RemoteTrack) {
        let Some(key) = self.session_key(participant_id) else {
            panic!("no transport for {participant_id}");
        };
        self.emit(TransportEvent::RemoteTrack(key, track)).await;
    }

    /// Sends through the sender of the participant named by the event's key,
    /// so events of replaced sessions can be replayed.
    pub async fn emit(&self, event: TransportEvent) {
        let tx = self
            .inner
            .sessions
            .lock()
            .unwrap()
            .get(&event.key().participant_id)
            .map(|(_, tx)| tx.clone());
        let Some(tx) = tx else {
            panic!("no transport for {}", event.key().participant_id);
        };
        tx.send(event).await.expect("mesh room is gone");
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn create(
        &self,
        key: SessionKey,
        capture: &LocalCapture,
        events: mpsc::Sender<TransportEvent>,
    ) -> anyhow::Result<Box<dyn PeerTransport>> {
        if self.inner.fail_next_create.swap(false, Ordering::SeqCst) {
            anyhow::bail!("mock transport creation failed");
        }

        self.inner.record(
            &key,
            TransportCall::Created {
                tracks: capture.track_ids(),
            },
        );
        self.inner
            .sessions
            .lock()
            .unwrap()
            .insert(key.participant_id.clone(), (key.clone(), events));

        Ok(Box::new(MockTransport {
            key,
            inner: Arc::clone(&self.inner),
            remote_set: AtomicBool::new(false),
            offers: AtomicUsize::new(0),
            answers: AtomicUsize::new(0),
        }))
    }
}

struct MockTransport {
    key: SessionKey,
    inner: Arc<MockInner>,
    remote_set: AtomicBool,
    offers: AtomicUsize,
    answers: AtomicUsize,
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn create_offer(&self, ice_restart: bool) -> anyhow::Result<String> {
        self.inner
            .record(&self.key, TransportCall::CreateOffer { ice_restart });
        let n = self.offers.fetch_add(1, Ordering::SeqCst) + 1;
        let suffix = if ice_restart { "-restart" } else { "" };
        Ok(format!("offer-to-{}-{}{}", self.key.participant_id, n, suffix))
    }

    async fn apply_offer(&self, sdp: String) -> anyhow::Result<()> {
        self.inner.record(&self.key, TransportCall::ApplyOffer { sdp });
        self.remote_set.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn create_answer(&self) -> anyhow::Result<String> {
        self.inner.record(&self.key, TransportCall::CreateAnswer);
        let n = self.answers.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("answer-to-{}-{}", self.key.participant_id, n))
    }

    async fn apply_answer(&self, sdp: String) -> anyhow::Result<()> {
        self.inner.record(&self.key, TransportCall::ApplyAnswer { sdp });
        self.remote_set.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: String) -> anyhow::Result<()> {
        if !self.remote_set.load(Ordering::SeqCst) {
            anyhow::bail!("candidate applied before remote description");
        }
        self.inner
            .record(&self.key, TransportCall::AddCandidate { candidate });
        Ok(())
    }

    async fn replace_local_tracks(&self, capture: &LocalCapture) -> anyhow::Result<()> {
        self.inner.record(
            &self.key,
            TransportCall::ReplaceTracks {
                tracks: capture.track_ids(),
            },
        );
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.inner.record(&self.key, TransportCall::Close);
        Ok(())
    }
}
