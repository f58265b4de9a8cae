use crate::config::RelayConfig;
use crate::relay::{RelayChannel, RoomRegistry};
use dashmap::DashMap;
use intercom_core::{
    ChannelId, ClientMessage, RawClientMessage, RawRelayMessage, RelayMessage, RoomId, decode,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

struct RelayInner {
    connections: DashMap<ChannelId, mpsc::UnboundedSender<RawRelayMessage>>,
    registry: RoomRegistry,
    config: RelayConfig,
}

/// Rendezvous point that routes signaling frames between rooms.
///
/// Cloning is cheap and every clone shares the same registry. Payloads
/// (offers, answers, candidates) pass through as opaque JSON.
#[derive(Clone)]
pub struct SignalingRelay {
    inner: Arc<RelayInner>,
}

impl SignalingRelay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                connections: DashMap::new(),
                registry: RoomRegistry::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.inner.registry
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    /// Accept a new transport connection. Nothing is routed to it until it
    /// sends `register`.
    pub fn open_channel(&self) -> RelayChannel {
        let id = ChannelId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.connections.insert(id, tx);
        debug!("Channel {} opened", id);
        RelayChannel { id, rx }
    }

    /// Parse and handle one text frame. Malformed frames are logged and dropped.
    pub fn handle_text(&self, channel: ChannelId, text: &str) {
        match decode::<RawClientMessage>(text) {
            Ok(msg) => self.handle_message(channel, msg),
            Err(e) => warn!("Invalid signaling frame from {}: {}", channel, e),
        }
    }

    pub fn handle_message(&self, channel: ChannelId, msg: RawClientMessage) {
        if let ClientMessage::Register { room_id } = msg {
            self.register(channel, room_id);
            return;
        }

        let Some(from) = self.inner.registry.room_of(channel) else {
            warn!(
                "Dropping '{}' from unregistered channel {}",
                msg.kind(),
                channel
            );
            return;
        };

        match msg {
            ClientMessage::Register { .. } => {}

            ClientMessage::Call { target_room, offer } => {
                info!("Call from '{}' to '{}'", from, target_room);
                let delivered = self.forward(channel, &target_room, || {
                    RelayMessage::IncomingCall {
                        from: from.clone(),
                        offer: offer.clone(),
                    }
                });

                if delivered == 0 {
                    info!("Target room '{}' is not reachable", target_room);
                    if self.inner.config.notify_unreachable {
                        self.send_to(channel, RelayMessage::TargetUnavailable { target_room });
                    }
                }
            }

            ClientMessage::Answer {
                target_room,
                answer,
            } => {
                self.forward(channel, &target_room, || RelayMessage::CallAnswered {
                    from: from.clone(),
                    answer: answer.clone(),
                });
            }

            ClientMessage::IceCandidate {
                target_room,
                candidate,
            } => {
                self.forward(channel, &target_room, || RelayMessage::IceCandidate {
                    from: from.clone(),
                    candidate: candidate.clone(),
                });
            }

            ClientMessage::HangUp { target_room } => {
                info!("Hang-up from '{}' to '{}'", from, target_room);
                self.forward(channel, &target_room, || RelayMessage::CallEnded {
                    from: from.clone(),
                });
            }
        }
    }

    /// Forget the channel: drop its binding and its outbound queue.
    pub fn disconnect(&self, channel: ChannelId) {
        self.inner.connections.remove(&channel);
        if let Some(room) = self.inner.registry.unregister(channel) {
            info!("Channel {} left room '{}'", channel, room);
        }
    }

    fn register(&self, channel: ChannelId, room: RoomId) {
        if !self.inner.connections.contains_key(&channel) {
            warn!("Register from closed channel {}", channel);
            return;
        }

        self.inner.registry.register(channel, room.clone());
        info!(
            "Room '{}' registered on channel {} (rooms: {})",
            room,
            channel,
            self.inner.registry.room_count()
        );
        self.send_to(channel, RelayMessage::Registered { room_id: room });
    }

    /// Deliver a frame to every channel of `target` except `sender`.
    /// Returns how many channels it was handed to.
    fn forward<F>(&self, sender: ChannelId, target: &RoomId, build: F) -> usize
    where
        F: Fn() -> RawRelayMessage,
    {
        let recipients: Vec<ChannelId> = self
            .inner
            .registry
            .members(target)
            .into_iter()
            .filter(|c| *c != sender)
            .collect();

        let mut delivered = 0;
        for recipient in recipients {
            let msg = build();
            debug!("Relaying '{}' to {} in '{}'", msg.kind(), recipient, target);
            if self.send_to(recipient, msg) {
                delivered += 1;
            }
        }
        delivered
    }

    fn send_to(&self, channel: ChannelId, msg: RawRelayMessage) -> bool {
        let Some(tx) = self.inner.connections.get(&channel) else {
            warn!("Attempted to send to closed channel {}", channel);
            return false;
        };
        if let Err(e) = tx.send(msg) {
            error!("Failed to queue frame for {}: {}", channel, e);
            return false;
        }
        true
    }
}

impl Default for SignalingRelay {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}
