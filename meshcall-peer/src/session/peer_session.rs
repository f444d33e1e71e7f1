use crate::error::{MeshError, Result};
use crate::media::{LocalCapture, RemoteStream, RemoteTrack};
use crate::session::{
    CandidateBuffer, Deadline, DeadlineKind, Role, SessionKey, SessionSnapshot, SessionState,
};
use crate::transport::{PeerTransport, TransportEvent, TransportFactory};
use anyhow::anyhow;
use meshcall_core::{ConnectionState, ParticipantId, SessionId, TransportAddress};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

pub const DEFAULT_NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    pub negotiation: Duration,
    pub recovery: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            negotiation: DEFAULT_NEGOTIATION_TIMEOUT,
            recovery: DEFAULT_RECOVERY_TIMEOUT,
        }
    }
}

/// What the room has to do after a transport state change.
#[derive(Debug)]
pub enum SessionTransition {
    Unchanged,
    /// Report the state to the observer; the session itself did not move.
    Report(ConnectionState),
    Connected,
    /// ICE restart started. The initiator's restart offer has to be sent.
    Recovering { restart_offer: Option<String> },
    /// Unrecoverable; the session has to be removed.
    Fatal(MeshError),
}

/// Negotiation state machine around one peer connection.
pub struct PeerSession {
    key: SessionKey,
    transport_address: TransportAddress,
    role: Role,
    state: SessionState,
    transport: Box<dyn PeerTransport>,
    candidates: CandidateBuffer,
    /// Last remote SDP applied.
    remote_description: Option<String>,
    /// Set while an ICE restart is in progress and the restart offer or answer
    /// has not been applied yet. Remote candidates are buffered meanwhile,
    /// since applying the restart description drops the agent's candidates.
    restart_pending: bool,
    awaiting_answer: bool,
    remote_stream: Option<RemoteStream>,
    deferred_tracks: Option<LocalCapture>,
    timeouts: SessionTimeouts,
    events: mpsc::Sender<TransportEvent>,
    deadline: Option<JoinHandle<()>>,
    deadline_epoch: u64,
}

impl PeerSession {
    /// Allocates the transport with the current local tracks attached and arms
    /// the negotiation deadline. The session starts in `Idle`.
    pub async fn create(
        factory: &dyn TransportFactory,
        key: SessionKey,
        transport_address: TransportAddress,
        role: Role,
        capture: &LocalCapture,
        events: mpsc::Sender<TransportEvent>,
        timeouts: SessionTimeouts,
    ) -> Result<Self> {
        let transport = factory
            .create(key.clone(), capture, events.clone())
            .await
            .map_err(MeshError::TransportFailure)?;

        info!(
            "Created {:?} session {} at {:?}",
            role, key, transport_address
        );

        let mut session = Self {
            key,
            transport_address,
            role,
            state: SessionState::Idle,
            transport,
            candidates: CandidateBuffer::new(),
            remote_description: None,
            restart_pending: false,
            awaiting_answer: false,
            remote_stream: None,
            deferred_tracks: None,
            timeouts,
            events,
            deadline: None,
            deadline_epoch: 0,
        };
        session.arm_deadline(DeadlineKind::Negotiation);

        Ok(session)
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.key.participant_id
    }

    pub fn session_id(&self) -> SessionId {
        self.key.session_id
    }

    pub fn transport_address(&self) -> &TransportAddress {
        &self.transport_address
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pending_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn has_remote_description(&self) -> bool {
        self.remote_description.is_some()
    }

    /// Whether remote candidates can go straight to the transport.
    fn accepts_candidates(&self) -> bool {
        self.remote_description.is_some() && !self.restart_pending
    }

    pub fn remote_stream(&self) -> Option<&RemoteStream> {
        self.remote_stream.as_ref()
    }

    /// Sends always go to the latest address the participant was seen at.
    pub fn set_transport_address(&mut self, address: TransportAddress) {
        if self.transport_address != address {
            debug!(
                "Transport address of {} changed: {:?} -> {:?}",
                self.key.participant_id, self.transport_address, address
            );
            self.transport_address = address;
        }
    }

    /// Initiator only: creates the initial offer. Returns the SDP to send.
    pub async fn start_offer(&mut self) -> Result<String> {
        if self.role != Role::Initiator || self.state != SessionState::Idle {
            return Err(self.protocol_error(format!(
                "cannot start offer as {:?} in {:?}",
                self.role, self.state
            )));
        }

        let sdp = self
            .transport
            .create_offer(false)
            .await
            .map_err(MeshError::TransportFailure)?;
        self.awaiting_answer = true;
        self.state = SessionState::Negotiating;

        Ok(sdp)
    }

    /// Responder only. Returns the answer to send, or `None` when the offer was
    /// a duplicate and got ignored.
    ///
    /// A different offer in `Connected` or `Recovering` is the initiator's ICE
    /// restart and is answered like the first one.
    pub async fn apply_remote_offer(&mut self, sdp: String) -> Result<Option<String>> {
        if self.role == Role::Initiator {
            return Err(self.protocol_error("offer received by initiator"));
        }

        let restart = match self.state {
            SessionState::Closed => {
                return Err(self.protocol_error("offer received by closed session"));
            }
            _ if self.remote_description.as_deref() == Some(sdp.as_str()) => {
                debug!("Ignoring repeated offer from {}", self.key.participant_id);
                return Ok(None);
            }
            SessionState::Idle | SessionState::Negotiating if self.remote_description.is_some() => {
                debug!(
                    "Ignoring second offer from {} during negotiation",
                    self.key.participant_id
                );
                return Ok(None);
            }
            SessionState::Idle | SessionState::Negotiating => false,
            SessionState::Connected | SessionState::Recovering => true,
        };

        if restart {
            info!("Applying ICE restart offer from {}", self.key.participant_id);
        }

        self.transport
            .apply_offer(sdp.clone())
            .await
            .map_err(MeshError::TransportFailure)?;
        self.remote_description = Some(sdp);
        self.restart_pending = false;
        self.drain_candidates().await;

        let answer = self
            .transport
            .create_answer()
            .await
            .map_err(MeshError::TransportFailure)?;

        if self.state == SessionState::Idle {
            self.state = SessionState::Negotiating;
        }

        Ok(Some(answer))
    }

    /// Initiator only, while an offer is outstanding.
    pub async fn apply_remote_answer(&mut self, sdp: String) -> Result<()> {
        if self.role == Role::Responder {
            return Err(self.protocol_error("answer received by responder"));
        }
        if !self.awaiting_answer {
            return Err(self.protocol_error("answer without an outstanding offer"));
        }

        self.transport
            .apply_answer(sdp.clone())
            .await
            .map_err(MeshError::TransportFailure)?;
        self.awaiting_answer = false;
        self.remote_description = Some(sdp);
        self.restart_pending = false;
        self.drain_candidates().await;

        Ok(())
    }

    /// Applies the candidate now, or buffers it until a remote description is
    /// set (or, during an ICE restart, until the restart description is).
    pub async fn add_remote_candidate(&mut self, candidate: String) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }

        if !self.accepts_candidates() {
            self.candidates.push(candidate);
            debug!(
                "Buffered ICE candidate from {} ({} pending)",
                self.key.participant_id,
                self.candidates.len()
            );
            return Ok(());
        }

        self.transport
            .add_ice_candidate(candidate)
            .await
            .map_err(MeshError::TransportFailure)
    }

    /// Applies buffered candidates in arrival order. Returns how many were applied.
    async fn drain_candidates(&mut self) -> usize {
        let pending = self.candidates.drain();
        if pending.is_empty() {
            return 0;
        }

        debug!(
            "Applying {} buffered ICE candidate(s) for {}",
            pending.len(),
            self.key.participant_id
        );

        let mut applied = 0;
        for candidate in pending {
            match self.transport.add_ice_candidate(candidate).await {
                Ok(()) => applied += 1,
                Err(e) => warn!(
                    "Failed to apply buffered ICE candidate for {}: {:#}",
                    self.key.participant_id, e
                ),
            }
        }
        applied
    }

    pub async fn handle_connection_state(
        &mut self,
        state: RTCPeerConnectionState,
    ) -> SessionTransition {
        if self.state == SessionState::Closed {
            return SessionTransition::Unchanged;
        }

        match state {
            RTCPeerConnectionState::Connecting => {
                SessionTransition::Report(ConnectionState::Connecting)
            }
            RTCPeerConnectionState::Disconnected => {
                SessionTransition::Report(ConnectionState::Disconnected)
            }
            RTCPeerConnectionState::Connected => self.on_connected().await,
            RTCPeerConnectionState::Failed => {
                if self.state == SessionState::Recovering {
                    SessionTransition::Fatal(MeshError::TransportFailure(anyhow!(
                        "connection to {} failed again during ICE restart",
                        self.key.participant_id
                    )))
                } else {
                    self.begin_recovery().await
                }
            }
            RTCPeerConnectionState::New
            | RTCPeerConnectionState::Closed
            | RTCPeerConnectionState::Unspecified => SessionTransition::Unchanged,
        }
    }

    async fn on_connected(&mut self) -> SessionTransition {
        if self.state == SessionState::Connected {
            return SessionTransition::Unchanged;
        }

        info!("Session {} connected", self.key);
        self.state = SessionState::Connected;
        self.cancel_deadline();

        if let Some(capture) = self.deferred_tracks.take() {
            debug!("Applying deferred local tracks for {}", self.key.participant_id);
            if let Err(e) = self.transport.replace_local_tracks(&capture).await {
                warn!(
                    "Failed to apply deferred local tracks for {}: {:#}",
                    self.key.participant_id, e
                );
            }
        }

        SessionTransition::Connected
    }

    /// One ICE restart per failure. The initiator creates the restart offer;
    /// the responder waits for it.
    async fn begin_recovery(&mut self) -> SessionTransition {
        warn!("Session {} failed; starting ICE restart", self.key);
        self.state = SessionState::Recovering;
        self.restart_pending = true;
        self.arm_deadline(DeadlineKind::Recovery);

        if self.role == Role::Responder {
            return SessionTransition::Recovering {
                restart_offer: None,
            };
        }

        match self.transport.create_offer(true).await {
            Ok(sdp) => {
                self.awaiting_answer = true;
                SessionTransition::Recovering {
                    restart_offer: Some(sdp),
                }
            }
            Err(e) => SessionTransition::Fatal(MeshError::TransportFailure(e)),
        }
    }

    /// Records an inbound track. Returns the stream when this track created it.
    pub fn on_remote_track(&mut self, track: RemoteTrack) -> Option<RemoteStream> {
        if self.state == SessionState::Closed {
            return None;
        }

        match &self.remote_stream {
            Some(stream) => {
                stream.add_track(track);
                None
            }
            None => {
                let stream = RemoteStream::new(self.key.participant_id.clone(), track);
                self.remote_stream = Some(stream.clone());
                Some(stream)
            }
        }
    }

    /// Swaps outgoing tracks without renegotiation. Deferred until `Connected`.
    pub async fn replace_local_tracks(&mut self, capture: &LocalCapture) -> Result<()> {
        match self.state {
            SessionState::Closed => Ok(()),
            SessionState::Connected => {
                self.deferred_tracks = None;
                self.transport
                    .replace_local_tracks(capture)
                    .await
                    .map_err(MeshError::TransportFailure)
            }
            _ => {
                debug!(
                    "Deferring local track swap for {} until connected",
                    self.key.participant_id
                );
                self.deferred_tracks = Some(capture.clone());
                Ok(())
            }
        }
    }

    /// Returns the timeout error if `deadline` is still the armed one.
    pub fn deadline_elapsed(&mut self, deadline: Deadline) -> Option<MeshError> {
        if deadline.epoch != self.deadline_epoch {
            return None;
        }
        if matches!(self.state, SessionState::Connected | SessionState::Closed) {
            return None;
        }

        self.deadline = None;
        Some(MeshError::NegotiationTimeout {
            participant_id: self.key.participant_id.clone(),
            phase: deadline.kind,
        })
    }

    fn arm_deadline(&mut self, kind: DeadlineKind) {
        self.cancel_deadline();

        let duration = match kind {
            DeadlineKind::Negotiation => self.timeouts.negotiation,
            DeadlineKind::Recovery => self.timeouts.recovery,
        };
        let deadline = Deadline {
            kind,
            epoch: self.deadline_epoch,
        };
        let key = self.key.clone();
        let events = self.events.clone();

        self.deadline = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = events
                .send(TransportEvent::DeadlineElapsed(key, deadline))
                .await;
        }));
    }

    fn cancel_deadline(&mut self) {
        if let Some(handle) = self.deadline.take() {
            handle.abort();
        }
        self.deadline_epoch += 1;
    }

    /// Releases the connection and drops buffered candidates. Idempotent.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        info!("Closing session {}", self.key);
        self.state = SessionState::Closed;
        self.cancel_deadline();
        self.candidates.clear();
        self.deferred_tracks = None;
        self.restart_pending = false;
        self.awaiting_answer = false;

        if let Err(e) = self.transport.close().await {
            warn!(
                "Failed to close transport for {}: {:#}",
                self.key.participant_id, e
            );
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            participant_id: self.key.participant_id.clone(),
            session_id: self.key.session_id,
            transport_address: self.transport_address.clone(),
            role: self.role,
            state: self.state,
            pending_candidates: self.candidates.len(),
            has_remote_description: self.remote_description.is_some(),
            has_remote_stream: self.remote_stream.is_some(),
        }
    }

    fn protocol_error(&self, reason: impl Into<String>) -> MeshError {
        MeshError::Protocol {
            participant_id: self.key.participant_id.clone(),
            reason: reason.into(),
        }
    }
}

impl Drop for PeerSession {
    fn drop(&mut self) {
        if let Some(handle) = self.deadline.take() {
            handle.abort();
        }
    }
}
