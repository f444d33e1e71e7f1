use meshcall_core::{ParticipantId, SessionId, TransportAddress};
use std::fmt;

/// Negotiation state of a peer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Negotiating,
    Connected,
    Recovering,
    Closed,
}

/// Which side creates the offer. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

/// Addresses one session instance; transport callbacks and timers carry it so
/// the room can drop events that outlived their session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub participant_id: ParticipantId,
    pub session_id: SessionId,
}

impl SessionKey {
    pub fn new(participant_id: ParticipantId) -> Self {
        Self {
            participant_id,
            session_id: SessionId::new(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.participant_id, self.session_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineKind {
    /// Initial offer/answer exchange has to reach `Connected`.
    Negotiation,
    /// ICE restart has to reach `Connected` again.
    Recovery,
}

impl fmt::Display for DeadlineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadlineKind::Negotiation => write!(f, "negotiation"),
            DeadlineKind::Recovery => write!(f, "ICE restart"),
        }
    }
}

/// A timer armed by a session. `epoch` identifies which arming it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub kind: DeadlineKind,
    pub epoch: u64,
}

/// Read-only view of a session, returned by `Orchestrator::sessions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub participant_id: ParticipantId,
    pub session_id: SessionId,
    pub transport_address: TransportAddress,
    pub role: Role,
    pub state: SessionState,
    pub pending_candidates: usize,
    pub has_remote_description: bool,
    pub has_remote_stream: bool,
}
