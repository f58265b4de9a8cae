use std::sync::Arc;
use std::time::Duration;

use intercom_client::{CallEngine, EngineConfig, EngineError, NoCaptureDevices};
use intercom_core::RoomId;

use crate::integration::{TestPanel, create_test_relay, init_tracing};
use crate::utils::{MockPeerFactory, MuteConnector};

#[tokio::test]
async fn test_connect_registers_room() {
    init_tracing();

    let relay = create_test_relay();
    let panel = TestPanel::connect(&relay, "media-room").await;

    assert!(panel.engine.is_connected().await);
    assert!(relay.registry().contains_room(&RoomId::from("media-room")));
    assert!(panel.engine.counterpart().await.is_none());
}

#[tokio::test]
async fn test_connect_times_out_without_ack() {
    init_tracing();

    let mut config = EngineConfig::new("media-room");
    config.register_timeout = Duration::from_millis(100);
    let (engine, _events) = CallEngine::new(
        config,
        Arc::new(MuteConnector::default()),
        Arc::new(NoCaptureDevices),
        MockPeerFactory::new("media-room"),
    );

    let err = engine.connect().await.unwrap_err();

    assert!(matches!(err, EngineError::RegistrationTimeout));
    assert!(!engine.is_connected().await);
}

#[tokio::test]
async fn test_calls_need_a_connection() {
    init_tracing();

    let relay = create_test_relay();
    let panel = TestPanel::new(&relay, "media-room");

    let err = panel.engine.start_call(&"main-room".into()).await.unwrap_err();

    assert!(matches!(err, EngineError::NotConnected));
    assert!(panel.peers.peers().is_empty());
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    init_tracing();

    let relay = create_test_relay();
    let panel = TestPanel::connect(&relay, "media-room").await;

    panel.engine.disconnect().await;
    panel.engine.disconnect().await;

    assert!(!panel.engine.is_connected().await);
    let room = RoomId::from("media-room");
    assert!(
        crate::utils::eventually(|| !relay.registry().contains_room(&room)).await,
        "room still registered after disconnect"
    );
}
