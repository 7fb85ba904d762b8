use crate::peer::PeerFactory;
use crate::room::Room;
use dashmap::DashMap;
use relay_core::{ConnectionId, RoomId, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// All live rooms, keyed by room id.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Arc<Room>>,
    peer_factory: Arc<dyn PeerFactory>,
    track_wait: Duration,
}

impl RoomRegistry {
    pub fn with_track_wait(peer_factory: Arc<dyn PeerFactory>, track_wait: Duration) -> Self {
        Self {
            rooms: DashMap::new(),
            peer_factory,
            track_wait,
        }
    }

    pub fn resolve_or_create_room(&self, room_id: &RoomId) -> Arc<Room> {
        if let Some(room) = self.get_room(room_id) {
            return room;
        }

        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                info!("Creating new room: {}", room_id);
                Arc::new(Room::new(
                    room_id.clone(),
                    self.peer_factory.clone(),
                    self.track_wait,
                ))
            })
            .value()
            .clone()
    }

    pub fn get_room(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|r| r.value().clone())
    }

    /// Unconditionally unregisters a room. The caller owns its teardown.
    pub fn remove_room(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.remove(room_id).map(|(_, r)| r)
    }

    /// Finds the room and participant bound to `connection`.
    ///
    /// Scans every room; only used when a channel closes.
    pub fn find_by_channel(&self, connection: ConnectionId) -> Option<(RoomId, UserId)> {
        let rooms: Vec<Arc<Room>> = self.rooms.iter().map(|e| e.value().clone()).collect();

        rooms.iter().find_map(|room| {
            room.member_with_channel(connection)
                .map(|user_id| (room.id().clone(), user_id))
        })
    }

    /// Drops and closes the room if nobody is left in it.
    pub async fn evict_if_empty(&self, room_id: &RoomId) -> bool {
        let Some((_, room)) = self.rooms.remove_if(room_id, |_, room| room.is_empty()) else {
            return false;
        };

        room.close().await;
        info!("Evicted empty room: {}", room_id);
        true
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|e| e.key().clone()).collect()
    }

    /// Closes every room. Used once at shutdown.
    pub async fn shutdown(&self) {
        for room_id in self.room_ids() {
            if let Some(room) = self.remove_room(&room_id) {
                room.close().await;
            }
        }
        info!("Room registry shut down");
    }
}
