mod webrtc_peer;

pub use webrtc_peer::{WebRtcPeer, WebRtcPeerFactory};

use anyhow::Result;
use async_trait::async_trait;
use intercom_core::{IceCandidate, IceServerConfig, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::media::{MediaTrack, RemoteTrack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// What a peer connection reports back while it negotiates.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A local candidate to trickle to the other room.
    IceCandidate(IceCandidate),
    RemoteTrack {
        stream_id: String,
        track: RemoteTrack,
    },
    StateChanged(PeerState),
}

/// One side of a one-to-one media session.
///
/// `close` must tolerate being called more than once.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn add_track(&self, track: &MediaTrack, stream_id: &str) -> Result<()>;

    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: UnboundedSender<PeerEvent>,
    ) -> Result<Arc<dyn PeerConnection>>;
}
