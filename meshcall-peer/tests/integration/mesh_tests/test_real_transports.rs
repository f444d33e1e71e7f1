use std::sync::Arc;
use std::time::Duration;

use meshcall_core::{ConnectionState, MediaKind};
use meshcall_peer::{
    LocalCapture, LocalMediaSource, LocalTrack, LoopbackHub, MeshConfig, Orchestrator,
    TransportConfig, static_sample_track,
};
use tokio::task::JoinHandle;
use webrtc::media::Sample;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::integration::init_tracing;
use crate::utils::{CONNECTION_TIMEOUT_MS, TestObserver};

struct RtcPeer {
    orchestrator: Orchestrator,
    observer: TestObserver,
    _media: LocalMediaSource,
}

async fn attach(hub: &LoopbackHub, id: &str, capture: LocalCapture) -> RtcPeer {
    let connection = hub.attach(id);
    let observer = TestObserver::new();
    let media = LocalMediaSource::new(capture);

    let config = MeshConfig::new(id).with_transport(TransportConfig::local_machine());
    let orchestrator = Orchestrator::start(config, Arc::new(connection.signaling), media.subscribe());
    orchestrator
        .set_observer(Arc::new(observer.clone()))
        .await
        .unwrap();
    orchestrator.signaling_adapter().forward_from(connection.inbox);

    RtcPeer {
        orchestrator,
        observer,
        _media: media,
    }
}

/// Writes dummy VP8 frames so the far side sees RTP.
fn pump(track: Arc<TrackLocalStaticSample>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let sample = Sample {
                data: vec![0x10, 0x02, 0x00, 0x9d, 0x01, 0x2a].into(),
                duration: Duration::from_millis(33),
                ..Default::default()
            };
            if track.write_sample(&sample).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(33)).await;
        }
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_receive_only_peers_connect() {
    init_tracing();

    let hub = LoopbackHub::new();
    let alice = attach(&hub, "alice", LocalCapture::empty()).await;
    let bob = attach(&hub, "bob", LocalCapture::empty()).await;

    assert!(
        alice
            .observer
            .wait_for_state("bob", ConnectionState::Connected, CONNECTION_TIMEOUT_MS)
            .await,
        "alice never connected to bob"
    );
    assert!(
        bob.observer
            .wait_for_state("alice", ConnectionState::Connected, CONNECTION_TIMEOUT_MS)
            .await,
        "bob never connected to alice"
    );

    alice.orchestrator.shutdown().await.unwrap();
    bob.orchestrator.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_video_flows_both_ways() {
    init_tracing();

    let alice_cam = static_sample_track(MediaKind::Video, "alice-cam", "alice");
    let bob_cam = static_sample_track(MediaKind::Video, "bob-cam", "bob");
    let pumps = [pump(Arc::clone(&alice_cam)), pump(Arc::clone(&bob_cam))];

    let hub = LoopbackHub::new();
    let alice = attach(&hub, "alice", LocalCapture::new(vec![alice_cam as LocalTrack])).await;
    let bob = attach(&hub, "bob", LocalCapture::new(vec![bob_cam as LocalTrack])).await;

    assert!(alice.observer.wait_for_stream("bob", CONNECTION_TIMEOUT_MS).await);
    assert!(bob.observer.wait_for_stream("alice", CONNECTION_TIMEOUT_MS).await);

    let stream = alice.orchestrator.remote_streams().get(&"bob".into()).unwrap();
    assert!(stream.has_kind(MediaKind::Video));
    assert!(stream.tracks()[0].rtc_track().is_some());

    alice.orchestrator.shutdown().await.unwrap();
    bob.orchestrator.shutdown().await.unwrap();
    for p in pumps {
        p.abort();
    }
}
