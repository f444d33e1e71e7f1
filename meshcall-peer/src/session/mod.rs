mod candidate_buffer;
mod peer_session;
mod session_state;

pub use candidate_buffer::*;
pub use peer_session::*;
pub use session_state::*;
