use crate::error::RelayError;
use crate::peer::{PeerControl, PeerFactory, PeerRole};
use crate::room::Participant;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use relay_core::{ConnectionId, RoomId, ServerMessage, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One multi-party session.
///
/// Participants, publishers and subscribers live in three independently
/// locked maps. Map guards are only held for lookup, insert and remove;
/// negotiation, keyframe requests and the track wait always run on cloned
/// `Arc`s after the guard is gone.
pub struct Room {
    id: RoomId,
    participants: DashMap<UserId, Participant>,
    publishers: DashMap<UserId, Arc<dyn PeerControl>>,
    subscribers: DashMap<UserId, Arc<dyn PeerControl>>,
    peer_factory: Arc<dyn PeerFactory>,
    track_wait: Duration,
}

impl Room {
    pub fn new(id: RoomId, peer_factory: Arc<dyn PeerFactory>, track_wait: Duration) -> Self {
        Self {
            id,
            participants: DashMap::new(),
            publishers: DashMap::new(),
            subscribers: DashMap::new(),
            peer_factory,
            track_wait,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    fn peers(&self, role: PeerRole) -> &DashMap<UserId, Arc<dyn PeerControl>> {
        match role {
            PeerRole::Publisher => &self.publishers,
            PeerRole::Subscriber => &self.subscribers,
        }
    }

    /// Inserts or rebinds a participant. Returns the handle it replaced.
    pub fn add_participant(&self, participant: Participant) -> Option<Participant> {
        self.participants.insert(participant.id.clone(), participant)
    }

    /// Inserts a participant unless one with the same identity is present.
    pub fn add_participant_if_absent(&self, participant: Participant) -> bool {
        match self.participants.entry(participant.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(participant);
                true
            }
        }
    }

    pub fn get_participant(&self, id: &UserId) -> Option<Participant> {
        self.participants.get(id).map(|p| p.value().clone())
    }

    pub fn remove_participant(&self, id: &UserId) -> Option<Participant> {
        self.participants.remove(id).map(|(_, p)| p)
    }

    /// Removes `id` only while it is still reachable through `connection`.
    pub fn remove_participant_bound_to(
        &self,
        id: &UserId,
        connection: ConnectionId,
    ) -> Option<Participant> {
        self.participants
            .remove_if(id, |_, p| p.connection_id() == connection)
            .map(|(_, p)| p)
    }

    pub fn has_participant(&self, id: &UserId) -> bool {
        self.participants.contains_key(id)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Which participant, if any, is reachable through `connection`.
    pub fn member_with_channel(&self, connection: ConnectionId) -> Option<UserId> {
        self.participants
            .iter()
            .find(|e| e.value().connection_id() == connection)
            .map(|e| e.key().clone())
    }

    pub fn activate_publisher(&self, id: &UserId) -> Arc<dyn PeerControl> {
        self.activate_peer(id, PeerRole::Publisher)
    }

    pub fn activate_subscriber(&self, id: &UserId) -> Arc<dyn PeerControl> {
        self.activate_peer(id, PeerRole::Subscriber)
    }

    /// Registers a fresh peer for `id`, replacing any previous one.
    ///
    /// The previous peer is stopped before its successor is constructed,
    /// with the map entry locked throughout, so two peers of the same role
    /// are never active for one identity. Its transport is closed in the
    /// background.
    fn activate_peer(&self, id: &UserId, role: PeerRole) -> Arc<dyn PeerControl> {
        let (peer, replaced) = match self.peers(role).entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                entry.get().stop();
                let peer = self.peer_factory.create(id, role);
                let old = entry.insert(peer.clone());
                (peer, Some(old))
            }
            Entry::Vacant(entry) => {
                let peer = self.peer_factory.create(id, role);
                entry.insert(peer.clone());
                (peer, None)
            }
        };

        if let Some(old) = replaced {
            info!(room = %self.id, user_id = %id, %role, "Replacing active peer");
            tokio::spawn(async move { old.close_transport().await });
        }

        peer
    }

    /// Stops and forgets the peer of `role` for `id`. Returns whether one existed.
    pub async fn release_peer(&self, id: &UserId, role: PeerRole) -> bool {
        let Some((_, peer)) = self.peers(role).remove(id) else {
            return false;
        };

        peer.stop();
        peer.close_transport().await;
        debug!(room = %self.id, user_id = %id, %role, "Released peer");
        true
    }

    /// Like [`Room::release_peer`], but leaves a newer replacement untouched.
    pub async fn release_peer_if_current(
        &self,
        id: &UserId,
        role: PeerRole,
        peer: &Arc<dyn PeerControl>,
    ) -> bool {
        let Some((_, current)) = self.peers(role).remove_if(id, |_, p| Arc::ptr_eq(p, peer)) else {
            return false;
        };

        current.stop();
        current.close_transport().await;
        debug!(room = %self.id, user_id = %id, %role, "Released peer");
        true
    }

    pub fn peer(&self, id: &UserId, role: PeerRole) -> Option<Arc<dyn PeerControl>> {
        self.peers(role).get(id).map(|p| p.value().clone())
    }

    pub fn has_peer(&self, id: &UserId, role: PeerRole) -> bool {
        self.peers(role).contains_key(id)
    }

    pub fn publisher_ids(&self) -> Vec<UserId> {
        self.publishers.iter().map(|e| e.key().clone()).collect()
    }

    pub async fn negotiate_sender(&self, id: &UserId, offer: String) -> Result<String, RelayError> {
        let peer = self
            .peer(id, PeerRole::Publisher)
            .ok_or_else(|| RelayError::PeerNotActive {
                user_id: id.clone(),
                role: PeerRole::Publisher,
            })?;

        peer.negotiate_as_sender(offer)
            .await
            .map_err(|source| RelayError::Negotiation {
                user_id: id.clone(),
                source,
            })
    }

    /// Negotiates `id`'s subscriber against `publisher_id`'s media.
    ///
    /// The publisher is looked up once; a concurrent republish may stop that
    /// snapshot right after, in which case the subscriber is bound to the
    /// stopped publisher's sources.
    pub async fn negotiate_receiver(
        &self,
        id: &UserId,
        publisher_id: &UserId,
        offer: String,
    ) -> Result<String, RelayError> {
        let publisher = self
            .peer(publisher_id, PeerRole::Publisher)
            .ok_or_else(|| RelayError::PublisherNotFound(publisher_id.clone()))?;

        let subscriber = self
            .peer(id, PeerRole::Subscriber)
            .ok_or_else(|| RelayError::PeerNotActive {
                user_id: id.clone(),
                role: PeerRole::Subscriber,
            })?;

        let sources = publisher.media_sources();
        if !sources.wait_ready(self.track_wait).await {
            debug!(
                room = %self.id,
                user_id = %id,
                publisher = %publisher_id,
                "Publisher tracks not ready, binding to pending sources"
            );
        }

        subscriber
            .negotiate_as_receiver(offer, sources)
            .await
            .map_err(|source| RelayError::Negotiation {
                user_id: id.clone(),
                source,
            })
    }

    /// Returns the number of publishers asked for a keyframe.
    pub async fn request_keyframe_from_all_except(&self, exclude: &UserId) -> usize {
        let targets: Vec<Arc<dyn PeerControl>> = self
            .publishers
            .iter()
            .filter(|e| e.key() != exclude)
            .map(|e| e.value().clone())
            .collect();

        for peer in &targets {
            peer.request_keyframe().await;
        }
        targets.len()
    }

    /// Best-effort fan-out to everyone but `originator`. Returns the recipient count.
    pub fn notify_others(&self, originator: &UserId, msg: &ServerMessage) -> usize {
        let recipients: Vec<Participant> = self
            .participants
            .iter()
            .filter(|e| e.key() != originator)
            .map(|e| e.value().clone())
            .collect();

        for participant in &recipients {
            participant.send(msg);
        }
        recipients.len()
    }

    pub fn notify_one(&self, id: &UserId, msg: &ServerMessage) -> bool {
        let Some(participant) = self.get_participant(id) else {
            debug!(room = %self.id, user_id = %id, "Notification target is not a member");
            return false;
        };
        participant.send(msg);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.publishers.is_empty() && self.subscribers.is_empty()
    }

    /// Releases every peer still registered in the room.
    pub async fn close(&self) {
        for role in [PeerRole::Publisher, PeerRole::Subscriber] {
            let ids: Vec<UserId> = self.peers(role).iter().map(|e| e.key().clone()).collect();
            for id in ids {
                self.release_peer(&id, role).await;
            }
        }
        info!(room = %self.id, "Room closed");
    }
}
