use meshcall_core::{SignalMessage, TransportAddress};
use meshcall_peer::{MeshError, SessionState, encode_signal};
use tokio::sync::mpsc;

use crate::integration::{create_test_mesh, init_tracing};
use crate::utils::{SIGNAL_TIMEOUT_MS, joined, session_of, wait_for_session_state};

#[tokio::test]
async fn test_forwarder_skips_malformed_payloads() {
    init_tracing();

    let mesh = create_test_mesh("alice").await;
    let (tx, rx) = mpsc::unbounded_channel();
    let forwarder = mesh.adapter.forward_from(rx);

    tx.send("{\"op\":\"participant-joined\"".to_owned()).unwrap();
    tx.send("{\"op\":\"wave\",\"d\":{}}".to_owned()).unwrap();
    tx.send(encode_signal(&joined("bob", "sock-bob")).unwrap()).unwrap();
    drop(tx);

    forwarder.await.unwrap();
    assert!(session_of(&mesh.orchestrator, "bob").await.is_some());
    assert_eq!(mesh.orchestrator.sessions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_dispatch_json_reports_codec_errors() {
    init_tracing();

    let mesh = create_test_mesh("alice").await;
    let err = mesh
        .adapter
        .dispatch_json("{\"op\":\"offer\",\"d\":{\"participantId\":\"bob\"}}")
        .await
        .unwrap_err();
    assert!(matches!(err, MeshError::Codec(_)));

    mesh.adapter
        .dispatch_json(
            r#"{"op":"offer","d":{"participantId":"bob","transportAddress":"sock-bob","sdp":"v=0"}}"#,
        )
        .await
        .unwrap();
    assert!(
        wait_for_session_state(&mesh.orchestrator, "bob", SessionState::Negotiating, SIGNAL_TIMEOUT_MS)
            .await
    );
    let session = session_of(&mesh.orchestrator, "bob").await.unwrap();
    assert_eq!(session.transport_address, TransportAddress::from("sock-bob"));

    // Own messages echoed by the channel are ignored.
    mesh.adapter
        .dispatch(SignalMessage::ParticipantJoined {
            participant_id: "alice".into(),
            transport_address: "sock-alice".into(),
            display_name: Some("Alice".into()),
        })
        .await
        .unwrap();
    assert_eq!(mesh.orchestrator.sessions().await.unwrap().len(), 1);
}
