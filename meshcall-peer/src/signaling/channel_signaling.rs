use crate::signaling::{SignalingOutput, encode_signal};
use async_trait::async_trait;
use meshcall_core::{ParticipantId, SignalMessage, TransportAddress};
use tokio::sync::mpsc;
use tracing::error;

/// `SignalingOutput` that serializes messages to JSON text onto a queue, for
/// whatever owns the real channel (a socket writer, the loopback hub).
#[derive(Clone)]
pub struct ChannelSignaling {
    local_id: ParticipantId,
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSignaling {
    pub fn new(local_id: ParticipantId) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { local_id, tx }, rx)
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    pub fn send_signal(&self, msg: SignalMessage) {
        match encode_signal(&msg) {
            Ok(json) => {
                if self.tx.send(json).is_err() {
                    error!(
                        "Signaling queue closed; dropping '{}' for {:?}",
                        msg.event_name(),
                        msg.transport_address()
                    );
                }
            }
            Err(e) => error!("Failed to serialize signal message: {}", e),
        }
    }
}

#[async_trait]
impl SignalingOutput for ChannelSignaling {
    async fn send_offer(&self, to: TransportAddress, sdp: String) {
        self.send_signal(SignalMessage::Offer {
            participant_id: self.local_id.clone(),
            transport_address: to,
            sdp,
        });
    }

    async fn send_answer(&self, to: TransportAddress, sdp: String) {
        self.send_signal(SignalMessage::Answer {
            participant_id: self.local_id.clone(),
            transport_address: to,
            sdp,
        });
    }

    async fn send_ice(&self, to: TransportAddress, candidate: String) {
        self.send_signal(SignalMessage::IceCandidate {
            participant_id: self.local_id.clone(),
            transport_address: to,
            candidate,
        });
    }
}
