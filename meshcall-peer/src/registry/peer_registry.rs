use crate::error::Result;
use crate::media::LocalCapture;
use crate::session::{PeerSession, Role, SessionKey, SessionSnapshot, SessionTimeouts};
use crate::transport::{TransportEvent, TransportFactory};
use meshcall_core::{ParticipantId, TransportAddress};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Owns every live peer session, at most one per participant.
pub struct PeerRegistry {
    sessions: HashMap<ParticipantId, PeerSession>,
    factory: Arc<dyn TransportFactory>,
    events: mpsc::Sender<TransportEvent>,
    timeouts: SessionTimeouts,
}

impl PeerRegistry {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        events: mpsc::Sender<TransportEvent>,
        timeouts: SessionTimeouts,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            factory,
            events,
            timeouts,
        }
    }

    /// Returns the session of `participant_id`, creating it if absent. The
    /// flag is `true` when the session was created by this call. An existing
    /// session keeps its role and only picks up the new address.
    pub async fn ensure_session(
        &mut self,
        participant_id: &ParticipantId,
        transport_address: &TransportAddress,
        role: Role,
        capture: &LocalCapture,
    ) -> Result<(&mut PeerSession, bool)> {
        match self.sessions.entry(participant_id.clone()) {
            Entry::Occupied(entry) => {
                let session = entry.into_mut();
                session.set_transport_address(transport_address.clone());
                Ok((session, false))
            }
            Entry::Vacant(entry) => {
                let session = PeerSession::create(
                    self.factory.as_ref(),
                    SessionKey::new(entry.key().clone()),
                    transport_address.clone(),
                    role,
                    capture,
                    self.events.clone(),
                    self.timeouts,
                )
                .await?;
                Ok((entry.insert(session), true))
            }
        }
    }

    pub fn get_mut(&mut self, participant_id: &ParticipantId) -> Option<&mut PeerSession> {
        self.sessions.get_mut(participant_id)
    }

    /// The session `key` points to, if it is still the live one.
    pub fn active_mut(&mut self, key: &SessionKey) -> Option<&mut PeerSession> {
        self.sessions
            .get_mut(&key.participant_id)
            .filter(|s| s.session_id() == key.session_id)
    }

    pub fn contains(&self, participant_id: &ParticipantId) -> bool {
        self.sessions.contains_key(participant_id)
    }

    /// Closes and removes the session. `None` if there was none, so a repeated
    /// removal is a no-op.
    pub async fn remove(&mut self, participant_id: &ParticipantId) -> Option<PeerSession> {
        let mut session = self.sessions.remove(participant_id)?;
        session.close().await;
        debug!("Removed session {}", session.key());
        Some(session)
    }

    /// Closes and removes every session.
    pub async fn remove_all(&mut self) -> Vec<PeerSession> {
        let mut removed = Vec::with_capacity(self.sessions.len());
        for participant_id in self.participant_ids() {
            if let Some(session) = self.remove(&participant_id).await {
                removed.push(session);
            }
        }
        removed
    }

    /// Snapshot of current participants, sorted. Iterating it stays valid while
    /// sessions are removed.
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<_> = self.sessions.values().map(|s| s.snapshot()).collect();
        snapshots.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
