mod ws_connector;

pub use ws_connector::WsConnector;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Duplex text channel to the signaling relay.
///
/// Dropping `outbound` closes the connection; `inbound` yields `None` once
/// the relay side is gone.
pub struct SignalingLink {
    pub outbound: UnboundedSender<String>,
    pub inbound: UnboundedReceiver<String>,
}

/// Opens signaling links.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<SignalingLink>;
}
