use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::sync::mpsc::UnboundedSender;

use intercom_client::{
    MediaKind, MediaTrack, PeerConnection, PeerConnectionFactory, PeerEvent, PeerState,
    RemoteTrack,
};
use intercom_core::{IceCandidate, IceServerConfig, SessionDescription};

/// Peer connection that negotiates nothing but behaves like one: it emits a
/// local candidate once its local description is set, announces remote
/// tracks once the remote one is, and refuses candidates before that.
pub struct MockPeer {
    label: String,
    events: UnboundedSender<PeerEvent>,
    gate: Option<Arc<Notify>>,
    fail_negotiation: bool,
    tracks: Mutex<Vec<MediaKind>>,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    candidates: Mutex<Vec<IceCandidate>>,
    closed: AtomicBool,
}

impl MockPeer {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn track_kinds(&self) -> Vec<MediaKind> {
        self.tracks.lock().unwrap().clone()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().unwrap().clone()
    }

    pub fn remote_candidates(&self) -> Vec<String> {
        self.candidates
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.candidate.clone())
            .collect()
    }

    async fn negotiate(&self, kind: &str) -> Result<String> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_negotiation {
            bail!("{} could not be created", kind);
        }
        Ok(format!("v=0 {} from {}", kind, self.label))
    }
}

#[async_trait]
impl PeerConnection for MockPeer {
    async fn add_track(&self, track: &MediaTrack, _stream_id: &str) -> Result<()> {
        self.tracks.lock().unwrap().push(track.kind());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        Ok(SessionDescription::offer(self.negotiate("offer").await?))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        if self.remote_description().is_none() {
            bail!("no remote offer to answer");
        }
        Ok(SessionDescription::answer(self.negotiate("answer").await?))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        *self.local.lock().unwrap() = Some(desc);
        let _ = self.events.send(PeerEvent::IceCandidate(IceCandidate {
            candidate: format!("candidate:{}", self.label),
            sdp_mid: Some("0".into()),
            sdp_m_line_index: Some(0),
            username_fragment: None,
        }));
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        *self.remote.lock().unwrap() = Some(desc);
        for (id, kind) in [("remote-audio", MediaKind::Audio), ("remote-video", MediaKind::Video)] {
            let _ = self.events.send(PeerEvent::RemoteTrack {
                stream_id: format!("seen-by-{}", self.label),
                track: RemoteTrack {
                    id: id.into(),
                    kind,
                },
            });
        }
        let _ = self.events.send(PeerEvent::StateChanged(PeerState::Connected));
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        if self.remote_description().is_none() {
            bail!("candidate arrived before the remote description");
        }
        self.candidates.lock().unwrap().push(candidate);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out [`MockPeer`]s and keeps them for inspection.
pub struct MockPeerFactory {
    label: String,
    peers: Mutex<Vec<Arc<MockPeer>>>,
    fail_negotiation: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockPeerFactory {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_owned(),
            peers: Mutex::new(Vec::new()),
            fail_negotiation: AtomicBool::new(false),
            gate: Mutex::new(None),
        })
    }

    /// Make offers and answers of later peers fail.
    pub fn fail_negotiation(&self, fail: bool) {
        self.fail_negotiation.store(fail, Ordering::SeqCst);
    }

    /// Later peers block in negotiation until the returned gate is notified.
    pub fn gate_negotiation(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn peers(&self) -> Vec<Arc<MockPeer>> {
        self.peers.lock().unwrap().clone()
    }

    pub fn last(&self) -> Arc<MockPeer> {
        self.peers().pop().expect("no peer connection was created")
    }
}

#[async_trait]
impl PeerConnectionFactory for MockPeerFactory {
    async fn create(
        &self,
        _ice_servers: &[IceServerConfig],
        events: UnboundedSender<PeerEvent>,
    ) -> Result<Arc<dyn PeerConnection>> {
        let peer = Arc::new(MockPeer {
            label: self.label.clone(),
            events,
            gate: self.gate.lock().unwrap().clone(),
            fail_negotiation: self.fail_negotiation.load(Ordering::SeqCst),
            tracks: Mutex::new(Vec::new()),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            candidates: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        self.peers.lock().unwrap().push(peer.clone());
        Ok(peer)
    }
}
