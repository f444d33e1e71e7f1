pub use meshcall_core::model::{ParticipantId, SignalMessage, TransportAddress};

pub mod model {
    pub use meshcall_core::model::*;
}

#[cfg(feature = "peer")]
pub mod peer {
    pub use meshcall_peer::*;
}

#[cfg(feature = "peer")]
pub use meshcall_peer::{
    ChannelObserver, LocalCapture, LocalMediaSource, LoopbackHub, MeshConfig, MeshEvent,
    MeshObserver, Orchestrator,
};
