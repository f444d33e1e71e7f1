use crate::media::LocalCapture;
use crate::session::SessionKey;
use crate::transport::TransportEvent;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// The underlying peer connection of one session.
///
/// SDP and candidates are passed as strings: SDP bodies as-is, candidates as
/// the JSON form of `RTCIceCandidateInit`.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Creates an offer and sets it as the local description.
    async fn create_offer(&self, ice_restart: bool) -> Result<String>;

    /// Sets a remote offer as the remote description.
    async fn apply_offer(&self, sdp: String) -> Result<()>;

    /// Creates an answer to the applied offer and sets it as the local description.
    async fn create_answer(&self) -> Result<String>;

    async fn apply_answer(&self, sdp: String) -> Result<()>;

    /// Fails if no remote description has been set yet.
    async fn add_ice_candidate(&self, candidate: String) -> Result<()>;

    /// Swaps outgoing tracks in place, without renegotiation.
    async fn replace_local_tracks(&self, capture: &LocalCapture) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Creates transports for new sessions.
///
/// The transport reports candidates, state changes and remote tracks through
/// `events`, tagged with `key`.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        key: SessionKey,
        capture: &LocalCapture,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>>;
}
