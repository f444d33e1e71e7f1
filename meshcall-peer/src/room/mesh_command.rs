use crate::room::MeshObserver;
use crate::session::SessionSnapshot;
use meshcall_core::SignalMessage;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Commands handled by the mesh room task.
pub enum MeshCommand {
    /// Inbound signaling message.
    Signal(SignalMessage),

    /// Replaces the active observer.
    SetObserver(Arc<dyn MeshObserver>),

    Sessions(oneshot::Sender<Vec<SessionSnapshot>>),

    /// Closes every session and stops the room; the sender is notified once done.
    Shutdown(oneshot::Sender<()>),
}
