use intercom_core::{
    ClientMessage, IceCandidate, IceServerConfig, RoomId, SessionDescription, encode,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::EngineError;
use crate::media::{MediaConstraints, MediaDevices, MediaStream, NoCaptureDevices, RemoteStream};
use crate::peer::{PeerConnection, PeerConnectionFactory, PeerState, WebRtcPeerFactory};
use crate::transport::{Connector, WsConnector};

mod answer_call_impl;
mod connect_impl;
mod create_pc_impl;
mod hang_up_impl;
mod handle_signal_impl;
mod start_call_impl;

pub const DEFAULT_REGISTER_TIMEOUT: Duration = Duration::from_secs(5);

/// Remote candidates kept per room while no session can take them.
const MAX_EARLY_CANDIDATES: usize = 64;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub room: RoomId,
    pub ice_servers: Vec<IceServerConfig>,
    pub media: MediaConstraints,
    pub register_timeout: Duration,
}

impl EngineConfig {
    pub fn new(room: impl Into<RoomId>) -> Self {
        Self {
            room: room.into(),
            ice_servers: vec![IceServerConfig::default()],
            media: MediaConstraints::default(),
            register_timeout: DEFAULT_REGISTER_TIMEOUT,
        }
    }
}

/// Everything the engine reports to whoever drives the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    Registered(RoomId),
    IncomingCall {
        from: RoomId,
        offer: SessionDescription,
    },
    CallAnswered {
        from: RoomId,
    },
    CallEnded {
        from: RoomId,
    },
    TargetUnavailable(RoomId),
    RemoteStream(RemoteStream),
    MediaStateChanged(PeerState),
    /// The relay connection is gone; any call it carried is over.
    TransportClosed,
}

pub type CallEvents = UnboundedReceiver<CallEvent>;

/// The live call: one peer connection with one other room.
pub(crate) struct CallSession {
    generation: u64,
    counterpart: RoomId,
    peer: Arc<dyn PeerConnection>,
    local: MediaStream,
    remote: Option<RemoteStream>,
    remote_applied: bool,
    pending_remote: Vec<IceCandidate>,
    pump: JoinHandle<()>,
}

/// A call or answer that is still acquiring media or negotiating.
struct PendingSetup {
    generation: u64,
    target: RoomId,
    /// Local candidates held back until the description is on the wire.
    outgoing: Vec<IceCandidate>,
    remote: Option<RemoteStream>,
}

#[derive(Default)]
struct EngineState {
    outbound: Option<UnboundedSender<String>>,
    reader: Option<JoinHandle<()>>,
    session: Option<CallSession>,
    pending: Option<PendingSetup>,
    generation: u64,
    early_candidates: HashMap<RoomId, Vec<IceCandidate>>,
    /// Rooms whose incoming call is announced but not yet answered or dropped.
    ringing: HashSet<RoomId>,
    hung_up_to: Option<RoomId>,
}

impl EngineState {
    fn send(&self, msg: &ClientMessage) -> Result<(), EngineError> {
        let outbound = self.outbound.as_ref().ok_or(EngineError::NotConnected)?;
        let text = encode(msg)?;
        debug!("-> {}", msg.kind());
        outbound.send(text).map_err(|_| EngineError::NotConnected)
    }

    /// Hold a candidate from `from` until its session exists. Only rooms with
    /// a ringing call or a setup in progress get a queue.
    fn queue_early(&mut self, from: RoomId, candidate: IceCandidate) {
        let expected = self.ringing.contains(&from)
            || self.pending.as_ref().is_some_and(|p| p.target == from);
        if !expected {
            debug!("Dropping candidate from '{}': no call with it", from);
            return;
        }
        let queue = self.early_candidates.entry(from).or_default();
        if queue.len() < MAX_EARLY_CANDIDATES {
            queue.push(candidate);
        }
    }
}

struct EngineInner {
    config: EngineConfig,
    connector: Arc<dyn Connector>,
    devices: Arc<dyn MediaDevices>,
    peers: Arc<dyn PeerConnectionFactory>,
    events: UnboundedSender<CallEvent>,
    state: Mutex<EngineState>,
}

/// Client side of one room: owns the relay connection and at most one call
/// session. Cheap to clone; clones drive the same engine.
#[derive(Clone)]
pub struct CallEngine {
    inner: Arc<EngineInner>,
}

impl CallEngine {
    pub fn new(
        config: EngineConfig,
        connector: Arc<dyn Connector>,
        devices: Arc<dyn MediaDevices>,
        peers: Arc<dyn PeerConnectionFactory>,
    ) -> (Self, CallEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let engine = CallEngine {
            inner: Arc::new(EngineInner {
                config,
                connector,
                devices,
                peers,
                events,
                state: Mutex::new(EngineState::default()),
            }),
        };
        (engine, rx)
    }

    /// Engine for a host without capture devices, on the native WebRTC stack.
    pub fn headless(config: EngineConfig, relay_url: impl Into<String>) -> (Self, CallEvents) {
        Self::new(
            config,
            Arc::new(WsConnector::new(relay_url)),
            Arc::new(NoCaptureDevices),
            Arc::new(WebRtcPeerFactory),
        )
    }

    pub fn room(&self) -> &RoomId {
        &self.inner.config.room
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await.outbound.is_some()
    }

    pub async fn local_stream(&self) -> Option<MediaStream> {
        self.state().await.session.as_ref().map(|s| s.local.clone())
    }

    pub async fn remote_stream(&self) -> Option<RemoteStream> {
        self.state().await.session.as_ref().and_then(|s| s.remote.clone())
    }

    /// Room on the other end of the live session.
    pub async fn counterpart(&self) -> Option<RoomId> {
        self.state().await.session.as_ref().map(|s| s.counterpart.clone())
    }

    async fn state(&self) -> MutexGuard<'_, EngineState> {
        self.inner.state.lock().await
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.inner.events.send(event);
    }
}
