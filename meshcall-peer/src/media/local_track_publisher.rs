use crate::media::LocalCapture;
use crate::registry::PeerRegistry;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Follows the local media source and pushes every new capture into all
/// sessions of a registry.
pub struct LocalTrackPublisher {
    rx: Option<watch::Receiver<LocalCapture>>,
    current: LocalCapture,
}

impl LocalTrackPublisher {
    pub fn new(rx: watch::Receiver<LocalCapture>) -> Self {
        let current = rx.borrow().clone();
        Self {
            rx: Some(rx),
            current,
        }
    }

    /// Capture that new sessions start with.
    pub fn current(&self) -> &LocalCapture {
        &self.current
    }

    /// Resolves with the next capture. Pends forever once the source is gone
    /// or the publisher was released; the last capture stays current.
    pub async fn changed(&mut self) -> LocalCapture {
        loop {
            let Some(rx) = self.rx.as_mut() else {
                return std::future::pending().await;
            };

            if rx.changed().await.is_ok() {
                let capture = rx.borrow_and_update().clone();
                self.current = capture.clone();
                return capture;
            }

            info!("Local media source closed; keeping last capture");
            self.rx = None;
        }
    }

    /// Replaces outgoing tracks on every session. Sessions that are not
    /// connected defer the swap, so this never waits on a negotiation.
    pub async fn publish(&self, registry: &mut PeerRegistry, capture: &LocalCapture) {
        let participants = registry.participant_ids();
        debug!(
            "Publishing local capture {:?} to {} session(s)",
            capture.track_ids(),
            participants.len()
        );

        for participant_id in participants {
            let Some(session) = registry.get_mut(&participant_id) else {
                continue;
            };
            if let Err(e) = session.replace_local_tracks(capture).await {
                warn!("Failed to replace local tracks for {}: {}", participant_id, e);
            }
        }
    }

    /// Stops listening to the source.
    pub fn release(&mut self) {
        self.rx = None;
    }
}
