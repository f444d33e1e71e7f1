use crate::media::RemoteTrack;
use crate::session::{Deadline, SessionKey};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// Events that transports and session timers post to the mesh room.
///
/// Each carries the `SessionKey` of the session that produced it; the room
/// ignores events whose session is no longer the active one.
#[derive(Debug)]
pub enum TransportEvent {
    /// Local ICE candidate gathered; has to be relayed to the remote side.
    CandidateGathered(SessionKey, String),

    /// Peer connection state changed.
    StateChanged(SessionKey, RTCPeerConnectionState),

    /// Inbound media track arrived.
    RemoteTrack(SessionKey, RemoteTrack),

    /// A negotiation or recovery timer fired.
    DeadlineElapsed(SessionKey, Deadline),
}

impl TransportEvent {
    pub fn key(&self) -> &SessionKey {
        match self {
            TransportEvent::CandidateGathered(key, _)
            | TransportEvent::StateChanged(key, _)
            | TransportEvent::RemoteTrack(key, _)
            | TransportEvent::DeadlineElapsed(key, _) => key,
        }
    }
}
