mod error;
mod media;
mod registry;
mod room;
mod session;
mod signaling;
mod transport;

pub use error::*;
pub use media::*;
pub use registry::*;
pub use room::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
