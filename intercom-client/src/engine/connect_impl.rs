use intercom_core::{ClientMessage, RelayMessage, decode, encode};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::engine::{CallEngine, CallEvent, EngineInner};
use crate::error::EngineError;

impl CallEngine {
    /// Open the relay connection and register this room. Returns once the
    /// relay has acknowledged the registration.
    pub async fn connect(&self) -> Result<(), EngineError> {
        if self.is_connected().await {
            return Ok(());
        }

        let room = self.room().clone();
        let mut link = self
            .inner
            .connector
            .connect()
            .await
            .map_err(EngineError::Transport)?;

        let register = encode::<ClientMessage>(&ClientMessage::Register {
            room_id: room.clone(),
        })?;
        link.outbound
            .send(register)
            .map_err(|_| EngineError::NotConnected)?;

        let deadline = Instant::now() + self.inner.config.register_timeout;
        loop {
            let text = match timeout_at(deadline, link.inbound.recv()).await {
                Err(_) => return Err(EngineError::RegistrationTimeout),
                Ok(None) => {
                    return Err(EngineError::Transport(anyhow::anyhow!(
                        "relay closed the connection before registration"
                    )));
                }
                Ok(Some(text)) => text,
            };
            match decode::<RelayMessage>(&text) {
                Ok(RelayMessage::Registered { room_id }) if room_id == room => break,
                Ok(other) => debug!("Ignoring {} before registration", other.kind()),
                Err(e) => warn!("{}", e),
            }
        }
        info!("Registered as room '{}'", room);

        let reader = tokio::spawn(read_loop(Arc::downgrade(&self.inner), link.inbound));
        {
            let mut state = self.state().await;
            state.outbound = Some(link.outbound);
            if let Some(old) = state.reader.replace(reader) {
                old.abort();
            }
        }

        self.emit(CallEvent::Registered(room));
        Ok(())
    }
}

async fn read_loop(inner: Weak<EngineInner>, mut inbound: UnboundedReceiver<String>) {
    while let Some(text) = inbound.recv().await {
        let Some(inner) = inner.upgrade() else { return };
        CallEngine { inner }.handle_signal(&text).await;
    }

    if let Some(inner) = inner.upgrade() {
        CallEngine { inner }.transport_closed().await;
    }
}
