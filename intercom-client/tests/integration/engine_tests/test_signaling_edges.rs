use serde_json::json;

use intercom_client::CallEvent;

use crate::integration::{TestPanel, create_test_relay, establish_call, init_tracing};
use crate::utils::{RawRoom, wait_for};

#[tokio::test]
async fn test_unreachable_target_is_reported() {
    init_tracing();

    let relay = create_test_relay();
    let mut media = TestPanel::connect(&relay, "media-room").await;

    media.engine.start_call(&"garage".into()).await.unwrap();

    let event = wait_for(&mut media.events, |e| {
        matches!(e, CallEvent::TargetUnavailable(_))
    })
    .await;
    assert_eq!(event, CallEvent::TargetUnavailable("garage".into()));
}

#[tokio::test]
async fn test_transport_loss_ends_the_call() {
    init_tracing();

    let relay = create_test_relay();
    let mut media = TestPanel::connect(&relay, "media-room").await;
    let mut main = TestPanel::connect(&relay, "main-room").await;
    establish_call(&mut media, &mut main).await;
    let local = media.engine.local_stream().await.unwrap();

    media.connector.drop_connections();

    wait_for(&mut media.events, |e| matches!(e, CallEvent::TransportClosed)).await;
    assert!(!media.engine.is_connected().await);
    assert!(media.engine.local_stream().await.is_none());
    assert_eq!(local.live_track_count(), 0);
    assert!(media.peers.last().is_closed());
}

#[tokio::test]
async fn test_call_ended_from_unrelated_room_is_ignored() {
    init_tracing();

    let relay = create_test_relay();
    let mut media = TestPanel::connect(&relay, "media-room").await;
    let mut main = TestPanel::connect(&relay, "main-room").await;
    let playroom = RawRoom::register(&relay, "playroom").await.unwrap();
    establish_call(&mut media, &mut main).await;

    playroom.send(json!({"type": "hang-up", "targetRoom": "media-room"}));

    let event = wait_for(&mut media.events, |e| matches!(e, CallEvent::CallEnded { .. })).await;
    assert_eq!(
        event,
        CallEvent::CallEnded {
            from: "playroom".into()
        }
    );
    assert_eq!(media.engine.counterpart().await, Some("main-room".into()));
    assert!(!media.peers.last().is_closed());
}

#[tokio::test]
async fn test_malformed_frame_is_dropped() {
    init_tracing();

    let relay = create_test_relay();
    let mut media = TestPanel::connect(&relay, "media-room").await;
    let playroom = RawRoom::register(&relay, "playroom").await.unwrap();

    // Valid for the relay, but the offer is not a session description.
    playroom.send(json!({"type": "call", "targetRoom": "media-room", "offer": 42}));
    playroom.send(json!({
        "type": "call",
        "targetRoom": "media-room",
        "offer": {"type": "offer", "sdp": "v=0"}
    }));

    let event = wait_for(&mut media.events, |e| {
        matches!(e, CallEvent::IncomingCall { .. })
    })
    .await;
    let CallEvent::IncomingCall { offer, .. } = event else {
        unreachable!()
    };
    assert_eq!(offer.sdp, "v=0");
    assert!(media.engine.is_connected().await);
}
