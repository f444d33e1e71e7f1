use crate::session::DeadlineKind;
use meshcall_core::ParticipantId;

pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors produced by peer sessions and the orchestrator.
///
/// Every variant is scoped to one participant at most; the orchestrator logs
/// them and turns fatal ones into state callbacks instead of returning them.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// A signaling message arrived that the session's role or state does not allow.
    #[error("protocol error from {participant_id}: {reason}")]
    Protocol {
        participant_id: ParticipantId,
        reason: String,
    },

    #[error("negotiation with {participant_id} timed out during {phase}")]
    NegotiationTimeout {
        participant_id: ParticipantId,
        phase: DeadlineKind,
    },

    /// The underlying peer connection rejected an operation or failed.
    #[error("transport failure: {0:#}")]
    TransportFailure(anyhow::Error),

    #[error("invalid signaling payload: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("orchestrator has shut down")]
    Shutdown,
}

impl MeshError {
    /// Fatal errors end the session they belong to.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MeshError::TransportFailure(_) | MeshError::NegotiationTimeout { .. }
        )
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, MeshError::Protocol { .. })
    }
}
