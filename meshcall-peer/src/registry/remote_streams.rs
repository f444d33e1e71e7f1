use crate::media::RemoteStream;
use dashmap::DashMap;
use meshcall_core::ParticipantId;
use std::sync::Arc;

/// Remote streams by participant, shared with the presentation layer.
///
/// Only the mesh room writes; handles are read-only outside the crate.
#[derive(Debug, Clone, Default)]
pub struct RemoteStreams {
    streams: Arc<DashMap<ParticipantId, RemoteStream>>,
}

impl RemoteStreams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, participant_id: &ParticipantId) -> Option<RemoteStream> {
        self.streams.get(participant_id).map(|s| s.value().clone())
    }

    pub fn contains(&self, participant_id: &ParticipantId) -> bool {
        self.streams.contains_key(participant_id)
    }

    /// Participants with a remote stream, sorted.
    pub fn participants(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.streams.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub(crate) fn insert(&self, stream: RemoteStream) {
        self.streams.insert(stream.participant_id().clone(), stream);
    }

    pub(crate) fn remove(&self, participant_id: &ParticipantId) -> Option<RemoteStream> {
        self.streams.remove(participant_id).map(|(_, s)| s)
    }
}
