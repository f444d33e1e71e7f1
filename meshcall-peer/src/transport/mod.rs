mod connection_wrapper;
mod peer_transport;
#[cfg(test)]
mod stub_transport;
mod transport_config;
mod transport_event;

pub use connection_wrapper::*;
pub use peer_transport::*;
#[cfg(test)]
pub(crate) use stub_transport::StubTransportFactory;
pub use transport_config::*;
pub use transport_event::*;
