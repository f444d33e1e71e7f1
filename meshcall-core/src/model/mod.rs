mod connection;
mod participant;
mod session;
mod signaling;

pub use connection::{ConnectionState, MediaKind};
pub use participant::{ParticipantId, TransportAddress};
pub use session::SessionId;
pub use signaling::{IceServerConfig, SignalMessage};
