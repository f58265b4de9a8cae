use intercom_core::{ChannelId, RawRelayMessage};
use tokio::sync::mpsc;

/// Receiving end of one connection to the relay.
///
/// The transport (WebSocket task or in-process test client) drains `rx` and
/// feeds inbound frames to [`crate::SignalingRelay::handle_text`] under `id`.
#[derive(Debug)]
pub struct RelayChannel {
    pub id: ChannelId,
    pub rx: mpsc::UnboundedReceiver<RawRelayMessage>,
}
