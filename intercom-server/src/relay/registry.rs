use dashmap::DashMap;
use intercom_core::{ChannelId, RoomId};
use std::collections::HashSet;
use tracing::debug;

/// Room -> channels map plus the reverse binding of each channel to the room
/// it registered under most recently.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, HashSet<ChannelId>>,
    bindings: DashMap<ChannelId, RoomId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `channel` to `room`. A channel already bound elsewhere is moved;
    /// the previous room is returned in that case.
    pub fn register(&self, channel: ChannelId, room: RoomId) -> Option<RoomId> {
        let previous = self
            .bindings
            .insert(channel, room.clone())
            .filter(|prev| *prev != room);

        if let Some(prev) = &previous {
            debug!("Channel {} moves from room '{}' to '{}'", channel, prev, room);
            self.detach(channel, prev);
        }

        self.rooms.entry(room).or_default().insert(channel);
        previous
    }

    /// Drop the channel's binding. Returns the room it was bound to.
    pub fn unregister(&self, channel: ChannelId) -> Option<RoomId> {
        let (_, room) = self.bindings.remove(&channel)?;
        self.detach(channel, &room);
        Some(room)
    }

    pub fn room_of(&self, channel: ChannelId) -> Option<RoomId> {
        self.bindings.get(&channel).map(|r| r.value().clone())
    }

    /// Snapshot of the channels registered under `room`.
    pub fn members(&self, room: &RoomId) -> Vec<ChannelId> {
        self.rooms
            .get(room)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains_room(&self, room: &RoomId) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn rooms(&self) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self.rooms.iter().map(|e| e.key().clone()).collect();
        rooms.sort();
        rooms
    }

    fn detach(&self, channel: ChannelId, room: &RoomId) {
        if let Some(mut set) = self.rooms.get_mut(room) {
            set.remove(&channel);
        }
        // The guard above must be released before remove_if locks the shard.
        if self.rooms.remove_if(room, |_, set| set.is_empty()).is_some() {
            debug!("Room '{}' has no channels left, removed", room);
        }
    }
}
