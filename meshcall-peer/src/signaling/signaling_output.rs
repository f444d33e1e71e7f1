use async_trait::async_trait;
use meshcall_core::TransportAddress;

/// Outbound side of the signaling channel.
///
/// Every send is addressed by the target's current transport address; the
/// implementation stamps the local participant id.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send_offer(&self, to: TransportAddress, sdp: String);

    async fn send_answer(&self, to: TransportAddress, sdp: String);

    /// `candidate` is the JSON form of an ICE candidate init.
    async fn send_ice(&self, to: TransportAddress, candidate: String);
}
