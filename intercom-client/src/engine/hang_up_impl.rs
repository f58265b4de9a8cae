use intercom_core::{ClientMessage, RoomId};
use tracing::{debug, info, warn};

use crate::engine::{CallEngine, CallSession};

impl CallEngine {
    /// End the call with `target`: tell it, then release everything local.
    /// Safe in any state; a repeated hang-up to the same room without new
    /// call activity in between is only sent once.
    pub async fn hang_up(&self, target: &RoomId) {
        let session = {
            let mut state = self.state().await;

            if state.hung_up_to.as_ref() == Some(target) {
                debug!("Already hung up on '{}'", target);
            } else {
                let msg = ClientMessage::HangUp {
                    target_room: target.clone(),
                };
                match state.send(&msg) {
                    Ok(()) => state.hung_up_to = Some(target.clone()),
                    Err(e) => debug!("Hang-up to '{}' not sent: {}", target, e),
                }
            }

            if state.pending.take().is_some() {
                info!("Cancelled call setup with '{}'", target);
            }
            state.early_candidates.remove(target);
            state.ringing.remove(target);
            state.session.take()
        };

        if let Some(session) = session {
            info!("Hung up on room '{}'", session.counterpart);
            close_session(session).await;
        }
    }

    /// Turn away a call from `from` without touching the live session.
    pub async fn reject(&self, from: &RoomId) {
        let mut state = self.state().await;
        state.early_candidates.remove(from);
        state.ringing.remove(from);
        let msg = ClientMessage::HangUp {
            target_room: from.clone(),
        };
        match state.send(&msg) {
            Ok(()) => info!("Rejected call from '{}' (busy)", from),
            Err(e) => warn!("Failed to reject call from '{}': {}", from, e),
        }
    }

    /// Stop ringing for `from` on this panel only. The caller is not told, so
    /// another panel of the same room can still pick up.
    pub async fn dismiss(&self, from: &RoomId) {
        let mut state = self.state().await;
        state.early_candidates.remove(from);
        if state.ringing.remove(from) {
            debug!("Dismissed call from '{}'", from);
        }
    }

    /// Release the session locally; nothing is sent to the relay.
    pub async fn end_session(&self) {
        let session = {
            let mut state = self.state().await;
            state.pending = None;
            state.session.take()
        };
        if let Some(session) = session {
            close_session(session).await;
        }
    }

    /// Drop the session and the relay connection. Calling it again does nothing.
    pub async fn disconnect(&self) {
        let session = {
            let mut state = self.state().await;
            if let Some(reader) = state.reader.take() {
                reader.abort();
            }
            if state.outbound.take().is_some() {
                info!("Disconnected room '{}' from the relay", self.room());
            }
            state.pending = None;
            state.early_candidates.clear();
            state.ringing.clear();
            state.session.take()
        };
        if let Some(session) = session {
            close_session(session).await;
        }
    }
}

pub(super) async fn close_session(session: CallSession) {
    session.local.stop();
    if let Err(e) = session.peer.close().await {
        warn!("Failed to close peer connection: {:#}", e);
    }
    session.pump.abort();
}
