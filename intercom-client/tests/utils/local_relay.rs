use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use intercom_client::{Connector, SignalingLink};
use intercom_core::{ChannelId, RawRelayMessage, encode};
use intercom_server::{RelayChannel, SignalingRelay};

use super::EVENT_TIMEOUT_MS;

/// Connects engines straight to an in-process relay.
#[derive(Clone)]
pub struct LocalConnector {
    relay: SignalingRelay,
    channels: Arc<Mutex<Vec<ChannelId>>>,
}

impl LocalConnector {
    pub fn new(relay: &SignalingRelay) -> Self {
        Self {
            relay: relay.clone(),
            channels: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Cut every link this connector opened, as a dropped network would.
    pub fn drop_connections(&self) {
        for id in self.channels.lock().unwrap().drain(..) {
            self.relay.disconnect(id);
        }
    }
}

#[async_trait]
impl Connector for LocalConnector {
    async fn connect(&self) -> Result<SignalingLink> {
        let RelayChannel { id, mut rx } = self.relay.open_channel();
        self.channels.lock().unwrap().push(id);

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
        let relay = self.relay.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    text = outbound_rx.recv() => match text {
                        Some(text) => relay.handle_text(id, &text),
                        None => break,
                    },
                    msg = rx.recv() => match msg {
                        Some(msg) => {
                            let Ok(text) = encode(&msg) else { continue };
                            if inbound_tx.send(text).is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            relay.disconnect(id);
        });

        Ok(SignalingLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

/// Opens links that never hear back from the relay.
#[derive(Default)]
pub struct MuteConnector {
    held: Mutex<Vec<(mpsc::UnboundedReceiver<String>, mpsc::UnboundedSender<String>)>>,
}

#[async_trait]
impl Connector for MuteConnector {
    async fn connect(&self) -> Result<SignalingLink> {
        let (outbound, sink) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        self.held.lock().unwrap().push((sink, inbound_tx));
        Ok(SignalingLink { outbound, inbound })
    }
}

/// A room driven by hand with raw frames, standing in for a browser panel.
pub struct RawRoom {
    pub id: ChannelId,
    relay: SignalingRelay,
    rx: mpsc::UnboundedReceiver<RawRelayMessage>,
}

impl RawRoom {
    pub async fn register(relay: &SignalingRelay, room: &str) -> Result<Self> {
        let RelayChannel { id, rx } = relay.open_channel();
        let mut raw = Self {
            id,
            relay: relay.clone(),
            rx,
        };
        raw.send(json!({"type": "register", "roomId": room}));
        raw.recv().await?;
        Ok(raw)
    }

    pub fn send(&self, frame: Value) {
        self.relay.handle_text(self.id, &frame.to_string());
    }

    pub async fn recv(&mut self) -> Result<RawRelayMessage> {
        tokio::time::timeout(Duration::from_millis(EVENT_TIMEOUT_MS), self.rx.recv())
            .await
            .context("Timeout waiting for relay frame")?
            .context("Relay closed the channel")
    }

    pub fn try_recv(&mut self) -> Option<RawRelayMessage> {
        self.rx.try_recv().ok()
    }
}
