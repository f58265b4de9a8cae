use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::transport::{Connector, SignalingLink};

/// Connects to the relay over a WebSocket.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<SignalingLink> {
        info!("Connecting to signaling relay: {}", self.url);

        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", self.url))?;
        let (mut write, mut read) = ws_stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = write.send(Message::text(text)).await {
                    error!("Failed to send signaling frame: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
            debug!("Signaling writer stopped");
        });

        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if inbound_tx.send(text.as_str().to_owned()).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Signaling relay closed the connection");
                        break;
                    }
                    Err(e) => {
                        warn!("Signaling connection error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            debug!("Signaling reader stopped");
        });

        Ok(SignalingLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
