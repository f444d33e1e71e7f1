use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one peer-session instance. A participant that leaves and
/// rejoins gets a fresh `SessionId`, which lets late callbacks from the old
/// connection be told apart from the live one.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
