mod local_media;
mod local_track_publisher;
mod remote_stream;

pub use local_media::*;
pub use local_track_publisher::*;
pub use remote_stream::*;
