use std::time::Duration;

use meshcall_core::{ConnectionState, MediaKind};
use meshcall_peer::{LocalCapture, MeshConfig, RemoteTrack, SessionState};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

use crate::integration::{create_test_mesh, create_test_mesh_with, init_tracing};
use crate::utils::{
    SIGNAL_TIMEOUT_MS, TransportCall, answer, joined, session_of, wait_for_removal,
    wait_for_session_state,
};

#[tokio::test(start_paused = true)]
async fn test_unanswered_offer_times_out() {
    init_tracing();

    let mesh = create_test_mesh("alice").await;
    mesh.signal(joined("bob", "sock-bob")).await;

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(session_of(&mesh.orchestrator, "bob").await.is_some());

    assert!(wait_for_removal(&mesh.orchestrator, "bob", 5_000).await);
    assert_eq!(
        mesh.observer.states_for("bob").await,
        vec![
            ConnectionState::New,
            ConnectionState::Connecting,
            ConnectionState::Failed
        ]
    );
    assert_eq!(mesh.transports.calls_for("bob").last(), Some(&TransportCall::Close));
}

#[tokio::test(start_paused = true)]
async fn test_connected_session_outlives_negotiation_timeout() {
    init_tracing();

    let config = MeshConfig::new("alice").with_negotiation_timeout(Duration::from_secs(5));
    let mesh = create_test_mesh_with(config, LocalCapture::empty()).await;
    mesh.signal(joined("bob", "sock-bob")).await;
    mesh.signal(answer("bob", "sock-bob", "answer-from-bob")).await;
    mesh.transports
        .emit_state("bob", RTCPeerConnectionState::Connected)
        .await;
    assert!(
        wait_for_session_state(&mesh.orchestrator, "bob", SessionState::Connected, SIGNAL_TIMEOUT_MS)
            .await
    );

    tokio::time::sleep(Duration::from_secs(10)).await;

    let session = session_of(&mesh.orchestrator, "bob").await.unwrap();
    assert_eq!(session.state, SessionState::Connected);
    assert!(
        !mesh
            .observer
            .states_for("bob")
            .await
            .contains(&ConnectionState::Failed)
    );
}

#[tokio::test(start_paused = true)]
async fn test_stalled_recovery_times_out() {
    init_tracing();

    let config = MeshConfig::new("alice").with_recovery_timeout(Duration::from_secs(3));
    let mesh = create_test_mesh_with(config, LocalCapture::empty()).await;
    mesh.signal(joined("bob", "sock-bob")).await;
    mesh.signal(answer("bob", "sock-bob", "answer-from-bob")).await;
    mesh.transports
        .emit_state("bob", RTCPeerConnectionState::Connected)
        .await;
    mesh.transports
        .emit_track("bob", RemoteTrack::detached("bob-audio", "bob-stream", MediaKind::Audio))
        .await;
    assert!(mesh.observer.wait_for_stream("bob", SIGNAL_TIMEOUT_MS).await);

    mesh.transports
        .emit_state("bob", RTCPeerConnectionState::Failed)
        .await;
    assert!(
        wait_for_session_state(&mesh.orchestrator, "bob", SessionState::Recovering, SIGNAL_TIMEOUT_MS)
            .await
    );

    // The restart offer is never answered.
    assert!(wait_for_removal(&mesh.orchestrator, "bob", 5_000).await);
    let states = mesh.observer.states_for("bob").await;
    assert_eq!(
        &states[states.len() - 2..],
        &[ConnectionState::Recovering, ConnectionState::Failed]
    );
    assert_eq!(mesh.observer.streams_removed("bob").await, 1);
}
