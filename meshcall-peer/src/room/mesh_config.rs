use crate::session::{DEFAULT_NEGOTIATION_TIMEOUT, DEFAULT_RECOVERY_TIMEOUT, Role, SessionTimeouts};
use crate::transport::TransportConfig;
use meshcall_core::ParticipantId;
use std::time::Duration;

pub const DEFAULT_DEPARTED_TTL: Duration = Duration::from_secs(60);

/// Decides which side of a newly joined pair creates the offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitiatorPolicy {
    /// The side whose participant id sorts lower initiates. Needs a signaling
    /// channel that announces existing members to newcomers.
    #[default]
    LowerIdInitiates,
    /// Whoever sees the join initiates. For channels that only announce
    /// newcomers to existing members.
    AlwaysOnJoin,
}

impl InitiatorPolicy {
    /// Role of the local side for a session created on a join.
    pub fn role_for(&self, local: &ParticipantId, remote: &ParticipantId) -> Role {
        match self {
            InitiatorPolicy::LowerIdInitiates if local < remote => Role::Initiator,
            InitiatorPolicy::LowerIdInitiates => Role::Responder,
            InitiatorPolicy::AlwaysOnJoin => Role::Initiator,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MeshConfig {
    pub local_id: ParticipantId,
    pub transport: TransportConfig,
    /// Bound on reaching `Connected` after a session is created.
    pub negotiation_timeout: Duration,
    /// Bound on reaching `Connected` again after a failure.
    pub recovery_timeout: Duration,
    pub initiator_policy: InitiatorPolicy,
    /// Capacity of the orchestrator's command queue.
    pub command_buffer: usize,
    /// How long signaling from a participant that left is ignored, unless
    /// they rejoin first.
    pub departed_ttl: Duration,
}

impl MeshConfig {
    pub fn new(local_id: impl Into<ParticipantId>) -> Self {
        Self {
            local_id: local_id.into(),
            transport: TransportConfig::default(),
            negotiation_timeout: DEFAULT_NEGOTIATION_TIMEOUT,
            recovery_timeout: DEFAULT_RECOVERY_TIMEOUT,
            initiator_policy: InitiatorPolicy::default(),
            command_buffer: 100,
            departed_ttl: DEFAULT_DEPARTED_TTL,
        }
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = timeout;
        self
    }

    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    pub fn with_initiator_policy(mut self, policy: InitiatorPolicy) -> Self {
        self.initiator_policy = policy;
        self
    }

    pub fn with_command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity.max(1);
        self
    }

    pub fn with_departed_ttl(mut self, ttl: Duration) -> Self {
        self.departed_ttl = ttl;
        self
    }

    pub fn timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            negotiation: self.negotiation_timeout,
            recovery: self.recovery_timeout,
        }
    }
}
