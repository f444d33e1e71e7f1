use meshcall_core::MediaKind;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

pub type LocalTrack = Arc<dyn TrackLocal + Send + Sync>;

/// The local capture shared by every session.
///
/// Cloning shares the tracks. An empty capture is a receive-only participant.
#[derive(Clone, Default)]
pub struct LocalCapture {
    tracks: Arc<Vec<(MediaKind, LocalTrack)>>,
}

impl LocalCapture {
    /// Tracks of an unsupported kind are skipped.
    pub fn new(tracks: Vec<LocalTrack>) -> Self {
        let tracks = tracks
            .into_iter()
            .filter_map(|track| media_kind(track.kind()).map(|kind| (kind, track)))
            .collect();

        Self {
            tracks: Arc::new(tracks),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &LocalTrack> {
        self.tracks.iter().map(|(_, track)| track)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// First track of `kind`; one sender per kind is negotiated.
    pub fn track_of_kind(&self, kind: MediaKind) -> Option<&LocalTrack> {
        self.tracks
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, track)| track)
    }

    pub fn track_ids(&self) -> Vec<String> {
        self.tracks().map(|t| t.id().to_owned()).collect()
    }
}

impl fmt::Debug for LocalCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCapture")
            .field("tracks", &self.track_ids())
            .finish()
    }
}

/// Publishes the current local capture.
///
/// Device or mute changes are published as a new capture; subscribers always
/// see the latest one.
pub struct LocalMediaSource {
    tx: watch::Sender<LocalCapture>,
}

impl LocalMediaSource {
    pub fn new(initial: LocalCapture) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn publish(&self, capture: LocalCapture) {
        self.tx.send_replace(capture);
    }

    pub fn subscribe(&self) -> watch::Receiver<LocalCapture> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> LocalCapture {
        self.tx.borrow().clone()
    }
}

impl Default for LocalMediaSource {
    fn default() -> Self {
        Self::new(LocalCapture::empty())
    }
}

pub fn media_kind(codec_type: RTPCodecType) -> Option<MediaKind> {
    match codec_type {
        RTPCodecType::Audio => Some(MediaKind::Audio),
        RTPCodecType::Video => Some(MediaKind::Video),
        RTPCodecType::Unspecified => None,
    }
}

pub fn codec_type(kind: MediaKind) -> RTPCodecType {
    match kind {
        MediaKind::Audio => RTPCodecType::Audio,
        MediaKind::Video => RTPCodecType::Video,
    }
}

/// Sample-fed local track with the platform default codec for `kind`
/// (Opus or VP8).
pub fn static_sample_track(
    kind: MediaKind,
    id: impl Into<String>,
    stream_id: impl Into<String>,
) -> Arc<TrackLocalStaticSample> {
    let mime_type = match kind {
        MediaKind::Audio => MIME_TYPE_OPUS,
        MediaKind::Video => MIME_TYPE_VP8,
    };

    Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: mime_type.to_owned(),
            ..Default::default()
        },
        id.into(),
        stream_id.into(),
    ))
}
