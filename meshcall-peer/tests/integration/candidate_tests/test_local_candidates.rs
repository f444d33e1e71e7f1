use crate::integration::{create_test_mesh, init_tracing};
use crate::utils::{SIGNAL_TIMEOUT_MS, joined};

#[tokio::test]
async fn test_gathered_candidates_are_sent_to_the_peer() {
    init_tracing();

    let mesh = create_test_mesh("alice").await;
    mesh.signal(joined("bob", "sock-bob")).await;

    mesh.transports.emit_candidate("bob", "local-1").await;
    mesh.transports.emit_candidate("bob", "local-2").await;

    assert!(mesh.signaling.wait_for_signals(3, SIGNAL_TIMEOUT_MS).await);
    assert_eq!(
        mesh.signaling.ice_candidates_to("sock-bob").await,
        vec!["local-1", "local-2"]
    );
}
