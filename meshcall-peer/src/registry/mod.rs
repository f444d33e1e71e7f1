mod peer_registry;
mod remote_streams;

pub use peer_registry::*;
pub use remote_streams::*;
