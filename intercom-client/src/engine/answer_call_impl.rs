use anyhow::Result;
use intercom_core::{ClientMessage, RoomId, SessionDescription};
use tracing::{info, warn};

use crate::engine::CallEngine;
use crate::engine::create_pc_impl::PreparedSession;
use crate::error::EngineError;

impl CallEngine {
    /// Accept the offer `from` sent: capture local media, answer, and apply
    /// any candidates that arrived ahead of the answer.
    pub async fn answer_call(
        &self,
        from: &RoomId,
        offer: SessionDescription,
    ) -> Result<(), EngineError> {
        let generation = self.begin_setup(from).await?;
        info!("Answering call from room '{}'", from);

        let prepared = match self.prepare_session(generation).await {
            Ok(prepared) => prepared,
            Err(e) => {
                self.abandon_setup(generation).await;
                return Err(e);
            }
        };

        let answer = match create_answer(&prepared, offer).await {
            Ok(answer) => answer,
            Err(e) => {
                prepared.discard().await;
                self.abandon_setup(generation).await;
                return Err(EngineError::Peer(e));
            }
        };

        let peer = prepared.peer.clone();
        let msg = ClientMessage::Answer {
            target_room: from.clone(),
            answer,
        };
        let early = self.complete_setup(prepared, msg, true).await?;

        for candidate in early {
            if let Err(e) = peer.add_ice_candidate(candidate).await {
                warn!("Failed to apply early ICE candidate: {:#}", e);
            }
        }
        Ok(())
    }
}

async fn create_answer(
    prepared: &PreparedSession,
    offer: SessionDescription,
) -> Result<SessionDescription> {
    prepared.peer.set_remote_description(offer).await?;
    let answer = prepared.peer.create_answer().await?;
    prepared.peer.set_local_description(answer.clone()).await?;
    Ok(answer)
}
