use crate::model::participant::{ParticipantId, TransportAddress};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// One logical event on the signaling channel.
///
/// Inbound, `participant_id` names the sender and `transport_address` is the
/// sender's current routing handle. Outbound, `participant_id` is the local
/// participant and `transport_address` is the target; the channel rewrites it
/// to the sender's address on delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum SignalMessage {
    ParticipantJoined {
        participant_id: ParticipantId,
        transport_address: TransportAddress,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
    },
    ParticipantLeft {
        participant_id: ParticipantId,
    },
    Offer {
        participant_id: ParticipantId,
        transport_address: TransportAddress,
        sdp: String,
    },
    Answer {
        participant_id: ParticipantId,
        transport_address: TransportAddress,
        sdp: String,
    },
    IceCandidate {
        participant_id: ParticipantId,
        transport_address: TransportAddress,
        candidate: String,
    },
}

impl SignalMessage {
    pub fn participant_id(&self) -> &ParticipantId {
        match self {
            Self::ParticipantJoined { participant_id, .. }
            | Self::ParticipantLeft { participant_id }
            | Self::Offer { participant_id, .. }
            | Self::Answer { participant_id, .. }
            | Self::IceCandidate { participant_id, .. } => participant_id,
        }
    }

    pub fn transport_address(&self) -> Option<&TransportAddress> {
        match self {
            Self::ParticipantLeft { .. } => None,
            Self::ParticipantJoined {
                transport_address, ..
            }
            | Self::Offer {
                transport_address, ..
            }
            | Self::Answer {
                transport_address, ..
            }
            | Self::IceCandidate {
                transport_address, ..
            } => Some(transport_address),
        }
    }

    /// Event name as it appears on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ParticipantJoined { .. } => "participant-joined",
            Self::ParticipantLeft { .. } => "participant-left",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
        }
    }

    /// Same message with the routing handle replaced; used by channels when
    /// delivering a payload so the receiver can reply to the sender.
    pub fn with_transport_address(self, address: TransportAddress) -> Self {
        match self {
            Self::ParticipantJoined {
                participant_id,
                display_name,
                ..
            } => Self::ParticipantJoined {
                participant_id,
                transport_address: address,
                display_name,
            },
            Self::ParticipantLeft { participant_id } => Self::ParticipantLeft { participant_id },
            Self::Offer {
                participant_id,
                sdp,
                ..
            } => Self::Offer {
                participant_id,
                transport_address: address,
                sdp,
            },
            Self::Answer {
                participant_id,
                sdp,
                ..
            } => Self::Answer {
                participant_id,
                transport_address: address,
                sdp,
            },
            Self::IceCandidate {
                participant_id,
                candidate,
                ..
            } => Self::IceCandidate {
                participant_id,
                transport_address: address,
                candidate,
            },
        }
    }
}
