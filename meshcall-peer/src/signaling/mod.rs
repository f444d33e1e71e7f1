mod channel_signaling;
mod loopback_hub;
mod signaling_adapter;
mod signaling_output;

pub use channel_signaling::*;
pub use loopback_hub::*;
pub use signaling_adapter::*;
pub use signaling_output::*;
