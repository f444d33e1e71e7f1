use serde::{Deserialize, Serialize};

/// Connection state reported to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    /// Transport failed once and an ICE restart is in progress.
    Recovering,
    /// Terminal failure: the session was closed and removed.
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}
