use crate::error::{MeshError, Result};
use crate::media::LocalCapture;
use crate::registry::RemoteStreams;
use crate::room::{MeshCommand, MeshConfig, MeshObserver, MeshRoom};
use crate::session::SessionSnapshot;
use crate::signaling::{SignalingAdapter, SignalingOutput};
use crate::transport::{RtcTransportFactory, TransportFactory};
use meshcall_core::ParticipantId;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::info;

/// Handle to one participant's mesh: one peer connection per remote member.
///
/// Cheap to clone; all clones talk to the same room task.
#[derive(Clone)]
pub struct Orchestrator {
    local_id: ParticipantId,
    command_tx: mpsc::Sender<MeshCommand>,
    remote_streams: RemoteStreams,
}

impl Orchestrator {
    /// Spawns the room with webrtc-rs transports. Must be called inside a
    /// tokio runtime.
    pub fn start(
        config: MeshConfig,
        signaling: Arc<dyn SignalingOutput>,
        media: watch::Receiver<LocalCapture>,
    ) -> Self {
        let factory = Arc::new(RtcTransportFactory::new(config.transport.clone()));
        Self::with_transport_factory(config, signaling, media, factory)
    }

    pub fn with_transport_factory(
        config: MeshConfig,
        signaling: Arc<dyn SignalingOutput>,
        media: watch::Receiver<LocalCapture>,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        info!("Starting orchestrator for {}", config.local_id);

        let local_id = config.local_id.clone();
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let remote_streams = RemoteStreams::new();

        let room = MeshRoom::new(
            config,
            command_rx,
            signaling,
            media,
            factory,
            remote_streams.clone(),
        );
        tokio::spawn(room.run());

        Self {
            local_id,
            command_tx,
            remote_streams,
        }
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    /// Entry point for inbound signaling.
    pub fn signaling_adapter(&self) -> SignalingAdapter {
        SignalingAdapter::new(self.command_tx.clone())
    }

    /// Read handle on the remote streams, kept in sync by the room.
    pub fn remote_streams(&self) -> RemoteStreams {
        self.remote_streams.clone()
    }

    /// Replaces the observer; later callbacks go to the new one only.
    pub async fn set_observer(&self, observer: Arc<dyn MeshObserver>) -> Result<()> {
        self.send(MeshCommand::SetObserver(observer)).await
    }

    pub async fn sessions(&self) -> Result<Vec<SessionSnapshot>> {
        let (tx, rx) = oneshot::channel();
        self.send(MeshCommand::Sessions(tx)).await?;
        rx.await.map_err(|_| MeshError::Shutdown)
    }

    /// Closes every session, stops taking signaling and releases the media
    /// source. Resolves once the room is done; a second call is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        if self.command_tx.send(MeshCommand::Shutdown(tx)).await.is_err() {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.command_tx.is_closed()
    }

    async fn send(&self, cmd: MeshCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| MeshError::Shutdown)
    }
}
