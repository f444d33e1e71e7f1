use crate::error::{MeshError, Result};
use crate::room::MeshCommand;
use meshcall_core::SignalMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub fn encode_signal(msg: &SignalMessage) -> Result<String> {
    Ok(serde_json::to_string(msg)?)
}

pub fn decode_signal(text: &str) -> Result<SignalMessage> {
    Ok(serde_json::from_str(text)?)
}

/// Inbound side of the signaling channel: hands channel events to the
/// orchestrator. Cheap to clone.
#[derive(Clone)]
pub struct SignalingAdapter {
    command_tx: mpsc::Sender<MeshCommand>,
}

impl SignalingAdapter {
    pub(crate) fn new(command_tx: mpsc::Sender<MeshCommand>) -> Self {
        Self { command_tx }
    }

    /// Fails with `Shutdown` once the orchestrator has stopped.
    pub async fn dispatch(&self, msg: SignalMessage) -> Result<()> {
        debug!(
            "Dispatching '{}' from {}",
            msg.event_name(),
            msg.participant_id()
        );
        self.command_tx
            .send(MeshCommand::Signal(msg))
            .await
            .map_err(|_| MeshError::Shutdown)
    }

    pub async fn dispatch_json(&self, text: &str) -> Result<()> {
        let msg = decode_signal(text)?;
        self.dispatch(msg).await
    }

    /// Feeds raw channel payloads until the channel closes or the orchestrator
    /// shuts down. Malformed payloads are logged and dropped.
    pub fn forward_from(&self, mut inbox: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        let adapter = self.clone();

        tokio::spawn(async move {
            while let Some(text) = inbox.recv().await {
                match adapter.dispatch_json(&text).await {
                    Ok(()) => {}
                    Err(MeshError::Shutdown) => break,
                    Err(e) => warn!("Dropping signaling payload: {}", e),
                }
            }
            debug!("Signaling forwarder finished");
        })
    }
}
