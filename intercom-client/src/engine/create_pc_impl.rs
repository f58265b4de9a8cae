use intercom_core::{ClientMessage, IceCandidate, RoomId};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::hang_up_impl::close_session;
use crate::engine::{CallEngine, CallEvent, CallSession, EngineInner, PendingSetup};
use crate::error::EngineError;
use crate::media::{MediaStream, RemoteStream, RemoteTrack, acquire_local_media};
use crate::peer::{PeerConnection, PeerEvent};

/// Media and peer connection built for a setup that has not gone out yet.
pub(super) struct PreparedSession {
    pub(super) generation: u64,
    pub(super) peer: Arc<dyn PeerConnection>,
    pub(super) local: MediaStream,
    pump: JoinHandle<()>,
}

impl PreparedSession {
    pub(super) async fn discard(self) {
        self.local.stop();
        if let Err(e) = self.peer.close().await {
            warn!("Failed to close abandoned peer connection: {:#}", e);
        }
        self.pump.abort();
    }
}

impl CallEngine {
    /// Claim the single setup slot, ending whatever session was live.
    pub(super) async fn begin_setup(&self, target: &RoomId) -> Result<u64, EngineError> {
        let (generation, previous) = {
            let mut state = self.state().await;
            if state.outbound.is_none() {
                return Err(EngineError::NotConnected);
            }
            if state.pending.is_some() {
                return Err(EngineError::SetupInProgress);
            }
            state.generation += 1;
            let generation = state.generation;
            state.pending = Some(PendingSetup {
                generation,
                target: target.clone(),
                outgoing: Vec::new(),
                remote: None,
            });
            state.hung_up_to = None;
            (generation, state.session.take())
        };

        if let Some(session) = previous {
            close_session(session).await;
        }
        Ok(generation)
    }

    pub(super) async fn prepare_session(
        &self,
        generation: u64,
    ) -> Result<PreparedSession, EngineError> {
        let local =
            acquire_local_media(self.inner.devices.as_ref(), self.inner.config.media).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let peer = match self.inner.peers.create(&self.inner.config.ice_servers, tx).await {
            Ok(peer) => peer,
            Err(e) => {
                local.stop();
                return Err(EngineError::Peer(e));
            }
        };
        let pump = tokio::spawn(pump_peer_events(
            Arc::downgrade(&self.inner),
            generation,
            rx,
        ));

        let prepared = PreparedSession {
            generation,
            peer,
            local,
            pump,
        };
        for track in prepared.local.tracks() {
            if let Err(e) = prepared.peer.add_track(track, prepared.local.id()).await {
                prepared.discard().await;
                return Err(EngineError::Peer(e));
            }
        }
        Ok(prepared)
    }

    /// Give the setup slot back after a failed setup, if it is still ours.
    pub(super) async fn abandon_setup(&self, generation: u64) {
        let mut state = self.state().await;
        if state
            .pending
            .as_ref()
            .is_some_and(|p| p.generation == generation)
        {
            state.pending = None;
        }
    }

    /// Send the negotiated description, release the held-back local
    /// candidates and make the session live. Returns the remote candidates
    /// that are ready to be applied now.
    pub(super) async fn complete_setup(
        &self,
        prepared: PreparedSession,
        message: ClientMessage,
        remote_applied: bool,
    ) -> Result<Vec<IceCandidate>, EngineError> {
        let mut state = self.state().await;

        let pending = match state.pending.take() {
            Some(p) if p.generation == prepared.generation => p,
            other => {
                state.pending = other;
                drop(state);
                debug!("Call setup was cancelled before it went out");
                prepared.discard().await;
                return Err(EngineError::Cancelled);
            }
        };

        if let Err(e) = state.send(&message) {
            drop(state);
            prepared.discard().await;
            return Err(e);
        }
        for candidate in pending.outgoing {
            let msg = ClientMessage::IceCandidate {
                target_room: pending.target.clone(),
                candidate,
            };
            if let Err(e) = state.send(&msg) {
                warn!("Failed to send ICE candidate: {}", e);
            }
        }

        state.ringing.remove(&pending.target);
        let early = state
            .early_candidates
            .remove(&pending.target)
            .unwrap_or_default();
        let (ready, pending_remote) = if remote_applied {
            (early, Vec::new())
        } else {
            (Vec::new(), early)
        };

        state.session = Some(CallSession {
            generation: prepared.generation,
            counterpart: pending.target,
            peer: prepared.peer,
            local: prepared.local,
            remote: pending.remote,
            remote_applied,
            pending_remote,
            pump: prepared.pump,
        });
        Ok(ready)
    }

    async fn on_peer_event(&self, generation: u64, event: PeerEvent) {
        match event {
            PeerEvent::IceCandidate(candidate) => {
                let mut state = self.state().await;
                if let Some(pending) = state
                    .pending
                    .as_mut()
                    .filter(|p| p.generation == generation)
                {
                    pending.outgoing.push(candidate);
                    return;
                }
                let Some(target) = state
                    .session
                    .as_ref()
                    .filter(|s| s.generation == generation)
                    .map(|s| s.counterpart.clone())
                else {
                    debug!("Dropping candidate of a finished session");
                    return;
                };
                let msg = ClientMessage::IceCandidate {
                    target_room: target,
                    candidate,
                };
                if let Err(e) = state.send(&msg) {
                    warn!("Failed to send ICE candidate: {}", e);
                }
            }
            PeerEvent::RemoteTrack { stream_id, track } => {
                let snapshot = {
                    let mut state = self.state().await;
                    let state = &mut *state;
                    let slot = match (&mut state.pending, &mut state.session) {
                        (Some(p), _) if p.generation == generation => &mut p.remote,
                        (_, Some(s)) if s.generation == generation => &mut s.remote,
                        _ => return,
                    };
                    add_remote_track(slot, stream_id, track)
                };
                if let Some(stream) = snapshot {
                    info!("Remote stream '{}' has {} track(s)", stream.id, stream.tracks.len());
                    self.emit(CallEvent::RemoteStream(stream));
                }
            }
            PeerEvent::StateChanged(peer_state) => {
                let current = {
                    let state = self.state().await;
                    state
                        .session
                        .as_ref()
                        .is_some_and(|s| s.generation == generation)
                        || state
                            .pending
                            .as_ref()
                            .is_some_and(|p| p.generation == generation)
                };
                if current {
                    self.emit(CallEvent::MediaStateChanged(peer_state));
                }
            }
        }
    }
}

/// Only the first remote stream is surfaced; later tracks extend it.
fn add_remote_track(
    slot: &mut Option<RemoteStream>,
    stream_id: String,
    track: RemoteTrack,
) -> Option<RemoteStream> {
    match slot {
        None => {
            *slot = Some(RemoteStream {
                id: stream_id,
                tracks: vec![track],
            });
        }
        Some(stream) if stream.id == stream_id => {
            if stream.tracks.iter().any(|t| t.id == track.id) {
                return None;
            }
            stream.tracks.push(track);
        }
        Some(_) => return None,
    }
    slot.clone()
}

async fn pump_peer_events(
    inner: Weak<EngineInner>,
    generation: u64,
    mut rx: UnboundedReceiver<PeerEvent>,
) {
    while let Some(event) = rx.recv().await {
        let Some(inner) = inner.upgrade() else { return };
        CallEngine { inner }.on_peer_event(generation, event).await;
    }
}
