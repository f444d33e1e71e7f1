use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a room member, assigned by the signaling channel.
///
/// Ordering is lexicographic on the underlying string and is what the
/// initiator tie-break compares.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Routing handle of the signaling channel (a socket or connection id).
/// Can change across signaling reconnects while the `ParticipantId` stays.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct TransportAddress(pub String);

impl TransportAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransportAddress {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for TransportAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TransportAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
