use crate::media::{LocalCapture, RemoteTrack, codec_type};
use crate::session::SessionKey;
use crate::transport::peer_transport::{PeerTransport, TransportFactory};
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::TransportEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use meshcall_core::MediaKind;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

/// webrtc-rs peer connection backing one session.
pub struct RtcTransport {
    key: SessionKey,
    peer_connection: Arc<RTCPeerConnection>,
    /// One sender per media kind, created up front so later captures can be
    /// swapped in with `replace_track`.
    senders: Vec<(MediaKind, Arc<RTCRtpSender>)>,
}

impl RtcTransport {
    /// Builds the peer connection, attaches the current local tracks and
    /// wires callbacks into `event_tx`.
    pub async fn new(
        key: SessionKey,
        config: &TransportConfig,
        capture: &LocalCapture,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let mut setting_engine = SettingEngine::default();
        setting_engine.set_include_loopback_candidate(config.include_loopback);

        let api = APIBuilder::new()
            .with_setting_engine(setting_engine)
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config.rtc_ice_servers(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        let state_key = key.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let key = state_key.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", key.participant_id, s);
                    let _ = tx.send(TransportEvent::StateChanged(key, s)).await;
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let ice_key = key.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let key = ice_key.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(json_candidate) = candidate.to_json() else {
                    return;
                };
                let Ok(str_candidate) = serde_json::to_string(&json_candidate) else {
                    return;
                };
                let _ = tx
                    .send(TransportEvent::CandidateGathered(key, str_candidate))
                    .await;
            })
        }));

        let track_tx = event_tx.clone();
        let track_key = key.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let key = track_key.clone();

                Box::pin(async move {
                    let Some(remote) = RemoteTrack::from_rtc(track) else {
                        warn!("Ignoring track of unknown kind from {}", key.participant_id);
                        return;
                    };
                    debug!(
                        "Remote {:?} track '{}' from {}",
                        remote.kind(),
                        remote.id(),
                        key.participant_id
                    );
                    let _ = tx.send(TransportEvent::RemoteTrack(key, remote)).await;
                })
            },
        ));

        let senders = attach_local_tracks(&peer_connection, capture).await?;

        Ok(Self {
            key,
            peer_connection,
            senders,
        })
    }
}

/// Adds one sender per media kind. Kinds missing from the capture get a
/// send-receive transceiver without a track, so the m-line exists and a later
/// capture can be swapped in.
async fn attach_local_tracks(
    peer_connection: &Arc<RTCPeerConnection>,
    capture: &LocalCapture,
) -> Result<Vec<(MediaKind, Arc<RTCRtpSender>)>> {
    let mut senders = Vec::with_capacity(2);

    for kind in [MediaKind::Audio, MediaKind::Video] {
        let sender = match capture.track_of_kind(kind) {
            Some(track) => peer_connection
                .add_track(Arc::clone(track))
                .await
                .with_context(|| format!("Failed to add local {:?} track", kind))?,
            None => {
                let init = RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Sendrecv,
                    send_encodings: vec![],
                };
                let transceiver = peer_connection
                    .add_transceiver_from_kind(codec_type(kind), Some(init))
                    .await
                    .with_context(|| format!("Failed to add {:?} transceiver", kind))?;
                transceiver.sender().await
            }
        };

        // RTCP has to be read for interceptors (NACK, reports) to work.
        let rtcp_sender = Arc::clone(&sender);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtcp_sender.read(&mut buf).await.is_ok() {}
        });

        senders.push((kind, sender));
    }

    Ok(senders)
}

#[async_trait]
impl PeerTransport for RtcTransport {
    async fn create_offer(&self, ice_restart: bool) -> Result<String> {
        let options = ice_restart.then(|| RTCOfferOptions {
            ice_restart: true,
            ..Default::default()
        });
        let offer = self.peer_connection.create_offer(options).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(offer.sdp)
    }

    async fn apply_offer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::offer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(answer.sdp)
    }

    async fn apply_answer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::answer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate_json: String) -> Result<()> {
        let candidate: RTCIceCandidateInit =
            serde_json::from_str(&candidate_json).context("Failed to parse ICE candidate JSON")?;
        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    async fn replace_local_tracks(&self, capture: &LocalCapture) -> Result<()> {
        for (kind, sender) in &self.senders {
            let track = capture.track_of_kind(*kind).cloned();
            debug!(
                "Replacing local {:?} track for {} (present: {})",
                kind,
                self.key.participant_id,
                track.is_some()
            );
            sender
                .replace_track(track)
                .await
                .with_context(|| format!("Failed to replace local {:?} track", kind))?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Creates an `RtcTransport` per session.
#[derive(Clone, Default)]
pub struct RtcTransportFactory {
    config: TransportConfig,
}

impl RtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn create(
        &self,
        key: SessionKey,
        capture: &LocalCapture,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>> {
        let transport = RtcTransport::new(key, &self.config, capture, events).await?;
        Ok(Box::new(transport))
    }
}
