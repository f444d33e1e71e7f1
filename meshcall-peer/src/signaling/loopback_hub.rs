use crate::signaling::{ChannelSignaling, decode_signal, encode_signal};
use dashmap::DashMap;
use meshcall_core::{ParticipantId, SignalMessage, TransportAddress};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// In-process signaling channel for running several orchestrators in one
/// process.
///
/// Each attached participant gets an address. Newcomers are announced to
/// everyone and receive the current roster; payloads are routed by target
/// address with `transportAddress` rewritten to the sender's.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    members: DashMap<TransportAddress, HubMember>,
    next_address: AtomicU64,
}

struct HubMember {
    participant_id: ParticipantId,
    inbox: mpsc::UnboundedSender<String>,
}

/// One participant's end of the hub.
pub struct HubConnection {
    pub participant_id: ParticipantId,
    pub address: TransportAddress,
    /// Outbound side; pass to the orchestrator.
    pub signaling: ChannelSignaling,
    /// Inbound JSON payloads; feed to `SignalingAdapter::forward_from`.
    pub inbox: mpsc::UnboundedReceiver<String>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called inside a tokio runtime; spawns the sender's routing task.
    pub fn attach(&self, participant_id: impl Into<ParticipantId>) -> HubConnection {
        let participant_id = participant_id.into();
        let n = self.inner.next_address.fetch_add(1, Ordering::Relaxed) + 1;
        let address = TransportAddress(format!("loop-{n}"));
        let (inbox_tx, inbox) = mpsc::unbounded_channel();

        for (member_id, member_address) in self.members() {
            deliver(
                &inbox_tx,
                &SignalMessage::ParticipantJoined {
                    participant_id: member_id,
                    transport_address: member_address,
                    display_name: None,
                },
            );
        }

        self.broadcast(&SignalMessage::ParticipantJoined {
            participant_id: participant_id.clone(),
            transport_address: address.clone(),
            display_name: None,
        });

        self.inner.members.insert(
            address.clone(),
            HubMember {
                participant_id: participant_id.clone(),
                inbox: inbox_tx,
            },
        );
        debug!("{} attached to loopback hub at {}", participant_id, address);

        let (signaling, outbound) = ChannelSignaling::new(participant_id.clone());
        tokio::spawn(self.clone().route(address.clone(), outbound));

        HubConnection {
            participant_id,
            address,
            signaling,
            inbox,
        }
    }

    /// Removes the member and announces `participant-left` to the rest.
    pub fn detach(&self, address: &TransportAddress) {
        let Some((_, member)) = self.inner.members.remove(address) else {
            return;
        };
        debug!("{} detached from loopback hub", member.participant_id);

        self.broadcast(&SignalMessage::ParticipantLeft {
            participant_id: member.participant_id,
        });
    }

    /// Current roster, sorted by participant id.
    pub fn members(&self) -> Vec<(ParticipantId, TransportAddress)> {
        let mut members: Vec<_> = self
            .inner
            .members
            .iter()
            .map(|m| (m.participant_id.clone(), m.key().clone()))
            .collect();
        members.sort_by(|a, b| a.0.cmp(&b.0));
        members
    }

    fn broadcast(&self, msg: &SignalMessage) {
        for member in self.inner.members.iter() {
            deliver(&member.inbox, msg);
        }
    }

    async fn route(self, from: TransportAddress, mut outbound: mpsc::UnboundedReceiver<String>) {
        while let Some(text) = outbound.recv().await {
            let msg = match decode_signal(&text) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("Hub dropped payload from {}: {}", from, e);
                    continue;
                }
            };
            let Some(to) = msg.transport_address().cloned() else {
                warn!("Hub dropped unaddressed '{}' from {}", msg.event_name(), from);
                continue;
            };
            let Some(target) = self.inner.members.get(&to) else {
                warn!("Hub has no member at {} ('{}' from {})", to, msg.event_name(), from);
                continue;
            };

            deliver(&target.inbox, &msg.with_transport_address(from.clone()));
        }
    }
}

fn deliver(inbox: &mpsc::UnboundedSender<String>, msg: &SignalMessage) {
    match encode_signal(msg) {
        Ok(json) => {
            let _ = inbox.send(json);
        }
        Err(e) => error!("Failed to serialize signal message: {}", e),
    }
}
