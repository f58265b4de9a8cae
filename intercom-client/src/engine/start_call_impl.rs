use anyhow::Result;
use intercom_core::{ClientMessage, RoomId, SessionDescription};
use tracing::info;

use crate::engine::CallEngine;
use crate::engine::create_pc_impl::PreparedSession;
use crate::error::EngineError;

impl CallEngine {
    /// Capture local media, negotiate an offer and send it to `target`.
    ///
    /// On failure nothing of the attempt is left behind.
    pub async fn start_call(&self, target: &RoomId) -> Result<(), EngineError> {
        if target == self.room() {
            return Err(EngineError::OwnRoom(target.clone()));
        }
        let generation = self.begin_setup(target).await?;
        info!("Calling room '{}'", target);

        let prepared = match self.prepare_session(generation).await {
            Ok(prepared) => prepared,
            Err(e) => {
                self.abandon_setup(generation).await;
                return Err(e);
            }
        };

        let offer = match create_offer(&prepared).await {
            Ok(offer) => offer,
            Err(e) => {
                prepared.discard().await;
                self.abandon_setup(generation).await;
                return Err(EngineError::Peer(e));
            }
        };

        let msg = ClientMessage::Call {
            target_room: target.clone(),
            offer,
        };
        self.complete_setup(prepared, msg, false).await?;
        Ok(())
    }
}

async fn create_offer(prepared: &PreparedSession) -> Result<SessionDescription> {
    let offer = prepared.peer.create_offer().await?;
    prepared.peer.set_local_description(offer.clone()).await?;
    Ok(offer)
}
