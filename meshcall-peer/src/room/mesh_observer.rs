use crate::media::RemoteStream;
use async_trait::async_trait;
use meshcall_core::{ConnectionState, ParticipantId};
use tokio::sync::mpsc;

/// Receives what the presentation layer renders.
///
/// For a removed participant `on_connection_state_changed` fires with the final
/// state before `on_remote_stream_removed`, and the latter only if a stream had
/// been added.
#[async_trait]
pub trait MeshObserver: Send + Sync + 'static {
    async fn on_remote_stream_added(&self, participant_id: ParticipantId, stream: RemoteStream);

    async fn on_remote_stream_removed(&self, participant_id: ParticipantId);

    async fn on_connection_state_changed(&self, participant_id: ParticipantId, state: ConnectionState);
}

/// Observer used until one is set.
pub struct NoopObserver;

#[async_trait]
impl MeshObserver for NoopObserver {
    async fn on_remote_stream_added(&self, _participant_id: ParticipantId, _stream: RemoteStream) {}

    async fn on_remote_stream_removed(&self, _participant_id: ParticipantId) {}

    async fn on_connection_state_changed(
        &self,
        _participant_id: ParticipantId,
        _state: ConnectionState,
    ) {
    }
}

#[derive(Debug, Clone)]
pub enum MeshEvent {
    StreamAdded {
        participant_id: ParticipantId,
        stream: RemoteStream,
    },
    StreamRemoved {
        participant_id: ParticipantId,
    },
    StateChanged {
        participant_id: ParticipantId,
        state: ConnectionState,
    },
}

impl MeshEvent {
    pub fn participant_id(&self) -> &ParticipantId {
        match self {
            MeshEvent::StreamAdded { participant_id, .. }
            | MeshEvent::StreamRemoved { participant_id }
            | MeshEvent::StateChanged { participant_id, .. } => participant_id,
        }
    }
}

/// Observer that forwards every callback as a `MeshEvent`.
#[derive(Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<MeshEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MeshEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: MeshEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl MeshObserver for ChannelObserver {
    async fn on_remote_stream_added(&self, participant_id: ParticipantId, stream: RemoteStream) {
        self.emit(MeshEvent::StreamAdded {
            participant_id,
            stream,
        });
    }

    async fn on_remote_stream_removed(&self, participant_id: ParticipantId) {
        self.emit(MeshEvent::StreamRemoved { participant_id });
    }

    async fn on_connection_state_changed(&self, participant_id: ParticipantId, state: ConnectionState) {
        self.emit(MeshEvent::StateChanged {
            participant_id,
            state,
        });
    }
}
