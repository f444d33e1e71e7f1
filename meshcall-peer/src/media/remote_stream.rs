use crate::media::media_kind;
use dashmap::DashMap;
use meshcall_core::{MediaKind, ParticipantId};
use std::fmt;
use std::sync::Arc;
use webrtc::track::track_remote::TrackRemote;

/// One inbound track of a remote participant.
#[derive(Clone)]
pub struct RemoteTrack {
    id: String,
    stream_id: String,
    kind: MediaKind,
    rtc: Option<Arc<TrackRemote>>,
}

impl RemoteTrack {
    /// `None` for tracks of unspecified kind.
    pub fn from_rtc(track: Arc<TrackRemote>) -> Option<Self> {
        let kind = media_kind(track.kind())?;
        Some(Self {
            id: track.id(),
            stream_id: track.stream_id(),
            kind,
            rtc: Some(track),
        })
    }

    /// A track description without a media pipeline behind it.
    pub fn detached(id: impl Into<String>, stream_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            stream_id: stream_id.into(),
            kind,
            rtc: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// RTP source for rendering; `None` for detached tracks.
    pub fn rtc_track(&self) -> Option<&Arc<TrackRemote>> {
        self.rtc.as_ref()
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Inbound media of one remote participant.
///
/// Clones share the track set, so tracks that arrive after the stream was
/// announced show up in every handle.
#[derive(Debug, Clone)]
pub struct RemoteStream {
    participant_id: ParticipantId,
    stream_id: String,
    tracks: Arc<DashMap<String, RemoteTrack>>,
}

impl RemoteStream {
    pub fn new(participant_id: ParticipantId, first: RemoteTrack) -> Self {
        let stream = Self {
            participant_id,
            stream_id: first.stream_id.clone(),
            tracks: Arc::new(DashMap::new()),
        };
        stream.add_track(first);
        stream
    }

    /// Returns `false` if a track with the same id was already present.
    pub fn add_track(&self, track: RemoteTrack) -> bool {
        self.tracks.insert(track.id.clone(), track).is_none()
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn tracks(&self) -> Vec<RemoteTrack> {
        let mut tracks: Vec<_> = self.tracks.iter().map(|t| t.value().clone()).collect();
        tracks.sort_by(|a, b| a.id.cmp(&b.id));
        tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn has_kind(&self, kind: MediaKind) -> bool {
        self.tracks.iter().any(|t| t.kind == kind)
    }
}
