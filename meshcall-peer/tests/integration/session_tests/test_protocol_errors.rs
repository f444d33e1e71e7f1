use meshcall_core::ConnectionState;

use crate::integration::{create_test_mesh, init_tracing};
use crate::utils::{TransportCall, answer, joined, offer, session_of};

#[tokio::test]
async fn test_offer_to_initiator_is_ignored() {
    init_tracing();

    let mesh = create_test_mesh("alice").await;
    mesh.signal(joined("bob", "sock-bob")).await;
    mesh.signal(offer("bob", "sock-bob", "glare-offer")).await;

    assert!(mesh.signaling.answers_to("sock-bob").await.is_empty());
    assert!(session_of(&mesh.orchestrator, "bob").await.is_some());
    assert!(
        !mesh
            .observer
            .states_for("bob")
            .await
            .contains(&ConnectionState::Failed)
    );
}

#[tokio::test]
async fn test_second_answer_is_ignored() {
    init_tracing();

    let mesh = create_test_mesh("alice").await;
    mesh.signal(joined("bob", "sock-bob")).await;
    mesh.signal(answer("bob", "sock-bob", "answer-1")).await;
    mesh.signal(answer("bob", "sock-bob", "answer-2")).await;

    let applied: Vec<_> = mesh
        .transports
        .calls_for("bob")
        .into_iter()
        .filter(|c| matches!(c, TransportCall::ApplyAnswer { .. }))
        .collect();
    assert_eq!(
        applied,
        vec![TransportCall::ApplyAnswer {
            sdp: "answer-1".into()
        }]
    );
    assert!(session_of(&mesh.orchestrator, "bob").await.is_some());
}

#[tokio::test]
async fn test_answer_to_responder_is_ignored() {
    init_tracing();

    let mesh = create_test_mesh("bob").await;
    mesh.signal(joined("alice", "sock-alice")).await;
    mesh.signal(answer("alice", "sock-alice", "stray-answer")).await;

    assert!(
        !mesh
            .transports
            .calls_for("alice")
            .iter()
            .any(|c| matches!(c, TransportCall::ApplyAnswer { .. }))
    );
    assert!(session_of(&mesh.orchestrator, "alice").await.is_some());
}

#[tokio::test]
async fn test_answer_without_session_creates_nothing() {
    init_tracing();

    let mesh = create_test_mesh("alice").await;
    mesh.signal(answer("bob", "sock-bob", "stray-answer")).await;

    assert!(mesh.orchestrator.sessions().await.unwrap().is_empty());
    assert_eq!(mesh.transports.created_count("bob"), 0);
}
