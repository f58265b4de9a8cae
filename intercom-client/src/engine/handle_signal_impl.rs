use intercom_core::{IceCandidate, RelayMessage, RoomId, SessionDescription, decode};
use tracing::{debug, error, info, warn};

use crate::engine::hang_up_impl::close_session;
use crate::engine::{CallEngine, CallEvent};

impl CallEngine {
    pub(super) async fn handle_signal(&self, text: &str) {
        let msg: RelayMessage = match decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("{}. Text: {}", e, text);
                return;
            }
        };
        debug!("<- {}", msg.kind());

        match msg {
            RelayMessage::Registered { room_id } => {
                self.emit(CallEvent::Registered(room_id));
            }

            RelayMessage::IncomingCall { from, offer } => {
                info!("Incoming call from room '{}'", from);
                {
                    let mut state = self.state().await;
                    state.early_candidates.remove(&from);
                    state.ringing.insert(from.clone());
                    state.hung_up_to = None;
                }
                self.emit(CallEvent::IncomingCall { from, offer });
            }

            RelayMessage::CallAnswered { from, answer } => {
                self.apply_answer(from, answer).await;
            }

            RelayMessage::IceCandidate { from, candidate } => {
                self.add_remote_candidate(from, candidate).await;
            }

            RelayMessage::CallEnded { from } => {
                info!("Room '{}' ended the call", from);
                self.emit(CallEvent::CallEnded { from: from.clone() });
                self.end_session_with(&from).await;
            }

            RelayMessage::TargetUnavailable { target_room } => {
                info!("Room '{}' has no panel online", target_room);
                self.emit(CallEvent::TargetUnavailable(target_room));
            }
        }
    }

    async fn apply_answer(&self, from: RoomId, answer: SessionDescription) {
        let (generation, peer) = {
            let state = self.state().await;
            match state.session.as_ref() {
                Some(s) if s.counterpart == from && !s.remote_applied => {
                    (s.generation, s.peer.clone())
                }
                _ => {
                    warn!("Unexpected answer from room '{}'", from);
                    return;
                }
            }
        };

        if let Err(e) = peer.set_remote_description(answer).await {
            error!("Failed to apply answer from '{}': {:#}", from, e);
            self.hang_up(&from).await;
            self.emit(CallEvent::CallEnded { from });
            return;
        }

        let queued = {
            let mut state = self.state().await;
            match state.session.as_mut() {
                Some(s) if s.generation == generation => {
                    s.remote_applied = true;
                    std::mem::take(&mut s.pending_remote)
                }
                _ => return,
            }
        };
        for candidate in queued {
            if let Err(e) = peer.add_ice_candidate(candidate).await {
                warn!("Failed to apply queued ICE candidate: {:#}", e);
            }
        }

        info!("Room '{}' answered", from);
        self.emit(CallEvent::CallAnswered { from });
    }

    async fn add_remote_candidate(&self, from: RoomId, candidate: IceCandidate) {
        let peer = {
            let mut guard = self.state().await;
            let state = &mut *guard;
            match state.session.as_mut() {
                Some(s) if s.counterpart == from && s.remote_applied => s.peer.clone(),
                Some(s) if s.counterpart == from => {
                    s.pending_remote.push(candidate);
                    return;
                }
                _ => {
                    state.queue_early(from, candidate);
                    return;
                }
            }
        };

        if let Err(e) = peer.add_ice_candidate(candidate).await {
            warn!("Failed to add ICE candidate from '{}': {:#}", from, e);
        }
    }

    /// Tear down whatever belongs to `from`: its live session or a setup
    /// still being prepared for it.
    async fn end_session_with(&self, from: &RoomId) {
        let session = {
            let mut state = self.state().await;
            state.early_candidates.remove(from);
            state.ringing.remove(from);
            if state.pending.as_ref().is_some_and(|p| &p.target == from) {
                state.pending = None;
            }
            let owned = state
                .session
                .as_ref()
                .is_some_and(|s| &s.counterpart == from);
            if owned {
                state.session.take()
            } else {
                None
            }
        };
        if let Some(session) = session {
            close_session(session).await;
        }
    }

    pub(super) async fn transport_closed(&self) {
        let session = {
            let mut state = self.state().await;
            state.outbound = None;
            state.reader = None;
            state.pending = None;
            state.early_candidates.clear();
            state.ringing.clear();
            state.session.take()
        };
        warn!("Lost connection to the signaling relay");
        if let Some(session) = session {
            close_session(session).await;
        }
        self.emit(CallEvent::TransportClosed);
    }
}
