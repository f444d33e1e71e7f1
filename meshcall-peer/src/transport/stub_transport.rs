use crate::media::LocalCapture;
use crate::session::SessionKey;
use crate::transport::{PeerTransport, TransportEvent, TransportFactory};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Transport that accepts everything and counts closes.
struct StubTransport {
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl PeerTransport for StubTransport {
    async fn create_offer(&self, ice_restart: bool) -> anyhow::Result<String> {
        Ok(format!("offer restart={ice_restart}"))
    }

    async fn apply_offer(&self, _sdp: String) -> anyhow::Result<()> {
        Ok(())
    }

    async fn create_answer(&self) -> anyhow::Result<String> {
        Ok("answer".into())
    }

    async fn apply_answer(&self, _sdp: String) -> anyhow::Result<()> {
        Ok(())
    }

    async fn add_ice_candidate(&self, _candidate: String) -> anyhow::Result<()> {
        Ok(())
    }

    async fn replace_local_tracks(&self, _capture: &LocalCapture) -> anyhow::Result<()> {
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub(crate) struct StubTransportFactory {
    created: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl StubTransportFactory {
    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportFactory for StubTransportFactory {
    async fn create(
        &self,
        _key: SessionKey,
        _capture: &LocalCapture,
        _events: mpsc::Sender<TransportEvent>,
    ) -> anyhow::Result<Box<dyn PeerTransport>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubTransport {
            closed: self.closed.clone(),
        }))
    }
}
