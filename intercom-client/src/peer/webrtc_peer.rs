use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use intercom_core::{IceCandidate, IceServerConfig, SdpType, SessionDescription};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_PCMU, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

use crate::media::{FrameSource, MediaKind, MediaTrack, RemoteTrack};
use crate::peer::{PeerConnection, PeerConnectionFactory, PeerEvent, PeerState};

/// Builds native peer connections on the `webrtc` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebRtcPeerFactory;

#[async_trait]
impl PeerConnectionFactory for WebRtcPeerFactory {
    async fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: UnboundedSender<PeerEvent>,
    ) -> Result<Arc<dyn PeerConnection>> {
        let peer = WebRtcPeer::new(ice_servers, events).await?;
        Ok(Arc::new(peer))
    }
}

pub struct WebRtcPeer {
    peer_connection: Arc<RTCPeerConnection>,
    pumps: Mutex<Vec<JoinHandle<()>>>,
}

impl WebRtcPeer {
    pub async fn new(
        ice_servers: &[IceServerConfig],
        events: UnboundedSender<PeerEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                Box::pin(async move {
                    info!("Peer connection state changed: {}", s);
                    if let Some(state) = peer_state(s) {
                        let _ = tx.send(PeerEvent::StateChanged(state));
                    }
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                match candidate.to_json() {
                    Ok(init) => {
                        let _ = tx.send(PeerEvent::IceCandidate(IceCandidate {
                            candidate: init.candidate,
                            sdp_mid: init.sdp_mid,
                            sdp_m_line_index: init.sdp_mline_index,
                            username_fragment: init.username_fragment,
                        }));
                    }
                    Err(e) => warn!("Failed to serialize local ICE candidate: {}", e),
                }
            })
        }));

        let track_tx = events;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>, _receiver, _transceiver| {
                let tx = track_tx.clone();
                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => MediaKind::Audio,
                        RTPCodecType::Video => MediaKind::Video,
                        other => {
                            debug!("Ignoring remote track of kind {}", other);
                            return;
                        }
                    };
                    let _ = tx.send(PeerEvent::RemoteTrack {
                        stream_id: track.stream_id(),
                        track: RemoteTrack {
                            id: track.id(),
                            kind,
                        },
                    });

                    // Nothing renders remote media here; keep the receiver drained.
                    tokio::spawn(async move { while track.read_rtp().await.is_ok() {} });
                })
            },
        ));

        Ok(Self {
            peer_connection,
            pumps: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PeerConnection for WebRtcPeer {
    async fn add_track(&self, track: &MediaTrack, stream_id: &str) -> Result<()> {
        let capability = match track.kind() {
            MediaKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_PCMU.to_owned(),
                clock_rate: 8000,
                channels: 1,
                ..Default::default()
            },
            MediaKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
        };

        let local = Arc::new(TrackLocalStaticSample::new(
            capability,
            track.id().to_owned(),
            stream_id.to_owned(),
        ));

        let rtp_sender = self
            .peer_connection
            .add_track(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .with_context(|| format!("Failed to add {} track", track.kind()))?;

        let mut pumps = self.pumps.lock().await;
        pumps.push(tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtp_sender.read(&mut buf).await.is_ok() {}
        }));

        // Raw video frames would need an encoder; video is negotiated only.
        if track.kind() == MediaKind::Audio {
            if let Some(source) = track.source() {
                pumps.push(spawn_audio_pump(track.clone(), local, Arc::clone(source)));
            }
        }

        debug!("Added local {} track '{}'", track.kind(), track.label());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        from_rtc(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        from_rtc(answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .context("Failed to add remote ICE candidate")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        for pump in self.pumps.lock().await.drain(..) {
            pump.abort();
        }
        self.peer_connection.close().await?;
        Ok(())
    }
}

fn spawn_audio_pump(
    track: MediaTrack,
    local: Arc<TrackLocalStaticSample>,
    source: Arc<dyn FrameSource>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let duration = source.frame_duration();
        let mut ticker = tokio::time::interval(duration);

        while track.is_live() {
            ticker.tick().await;
            if !track.is_enabled() {
                continue;
            }
            let sample = Sample {
                data: source.next_frame(),
                duration,
                ..Default::default()
            };
            if let Err(e) = local.write_sample(&sample).await {
                warn!("Failed to write audio sample: {}", e);
                break;
            }
        }
        debug!("Audio pump for track '{}' stopped", track.id());
    })
}

fn peer_state(s: RTCPeerConnectionState) -> Option<PeerState> {
    match s {
        RTCPeerConnectionState::New => Some(PeerState::New),
        RTCPeerConnectionState::Connecting => Some(PeerState::Connecting),
        RTCPeerConnectionState::Connected => Some(PeerState::Connected),
        RTCPeerConnectionState::Disconnected => Some(PeerState::Disconnected),
        RTCPeerConnectionState::Failed => Some(PeerState::Failed),
        RTCPeerConnectionState::Closed => Some(PeerState::Closed),
        _ => None,
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpType::Rollback => bail!("rollback descriptions are not supported"),
    };
    Ok(rtc)
}

fn from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        other => bail!("unexpected session description type {}", other),
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}
