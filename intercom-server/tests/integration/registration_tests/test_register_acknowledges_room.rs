use intercom_core::{RelayMessage, RoomId};
use serde_json::json;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::TestChannel;

#[tokio::test]
async fn test_register_acknowledges_room() {
    init_tracing();

    let relay = create_test_relay();
    let mut channel = TestChannel::open(&relay);

    channel.send(json!({"type": "register", "roomId": "media-room"}));

    let ack = channel.recv().await.expect("No ack");
    assert_eq!(
        ack,
        RelayMessage::Registered {
            room_id: RoomId::from("media-room")
        }
    );
    assert_eq!(
        relay.registry().members(&"media-room".into()),
        vec![channel.id]
    );
}
