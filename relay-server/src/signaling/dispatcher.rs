use crate::error::RelayError;
use crate::peer::PeerRole;
use crate::room::{Participant, Room, RoomRegistry};
use crate::signaling::SessionChannel;
use relay_core::{
    ConnectionId, PublishRequest, RoomId, RoomRequest, ServerMessage, SignalMessage,
    SubscribeRequest, UserId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Routes decoded signaling messages to room operations.
///
/// Stateless apart from the registry: per-participant state lives in the
/// room's peer maps. Every failure is logged and the message dropped; no
/// error is ever sent back to the participant.
#[derive(Clone)]
pub struct SignalingDispatcher {
    registry: Arc<RoomRegistry>,
}

impl SignalingDispatcher {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Entry point for one raw inbound message.
    pub async fn handle_text(&self, channel: &SessionChannel, text: &str) {
        let message = match SignalMessage::decode(text).map_err(RelayError::from) {
            Ok(message) => message,
            Err(e) => {
                warn!(connection = %channel.id(), "Invalid SignalMessage: {}", e);
                return;
            }
        };

        let kind = message.kind();
        let room_id = message.room_id().clone();
        let user_id = message.user_id().clone();

        if let Err(e) = self.dispatch(channel, message).await {
            warn!(room = %room_id, %user_id, kind, "Dropping signaling message: {}", e);
        }
    }

    pub async fn dispatch(
        &self,
        channel: &SessionChannel,
        message: SignalMessage,
    ) -> Result<(), RelayError> {
        debug!(
            connection = %channel.id(),
            room = %message.room_id(),
            user_id = %message.user_id(),
            "Dispatching {}",
            message.kind()
        );

        match message {
            SignalMessage::Join(req) => self.handle_join(channel, req),
            SignalMessage::Leave(req) => self.handle_leave(req).await,
            SignalMessage::Publish(req) => self.handle_publish(channel, req).await,
            SignalMessage::Subscribe(req) => self.handle_subscribe(channel, req).await,
        }
    }

    /// Cleans up after a closed signaling channel in every room it was bound to.
    pub async fn handle_disconnect(&self, connection: ConnectionId) {
        let mut cleaned = 0;

        while let Some((room_id, user_id)) = self.registry.find_by_channel(connection) {
            let Some(room) = self.registry.get_room(&room_id) else {
                continue;
            };
            if self.remove_from_room(&room, &user_id, Some(connection)).await {
                info!(room = %room_id, %user_id, "Participant disconnected");
                cleaned += 1;
            }
        }

        if cleaned == 0 {
            debug!(%connection, "Closed channel was not bound to any participant");
        }
    }

    /// Puts the participant into the room, retrying if the room was evicted
    /// between lookup and insert. `rebind` replaces an existing handle.
    fn enter_room(&self, room_id: &RoomId, participant: Participant, rebind: bool) -> Arc<Room> {
        loop {
            let room = self.registry.resolve_or_create_room(room_id);

            if rebind {
                room.add_participant(participant.clone());
            } else {
                room.add_participant_if_absent(participant.clone());
            }

            match self.registry.get_room(room_id) {
                Some(current) if Arc::ptr_eq(&current, &room) => return room,
                _ => debug!(room = %room_id, "Room evicted during entry, retrying"),
            }
        }
    }

    fn handle_join(&self, channel: &SessionChannel, req: RoomRequest) -> Result<(), RelayError> {
        let RoomRequest { room_id, user_id } = req;
        let room = self.enter_room(
            &room_id,
            Participant::new(user_id.clone(), channel.clone()),
            true,
        );

        for pub_id in room.publisher_ids() {
            if pub_id != user_id {
                room.notify_one(&user_id, &ServerMessage::publisher_announcement(pub_id));
            }
        }
        room.notify_one(&user_id, &ServerMessage::joined());

        info!(room = %room_id, %user_id, "Participant joined");
        Ok(())
    }

    async fn handle_leave(&self, req: RoomRequest) -> Result<(), RelayError> {
        let RoomRequest { room_id, user_id } = req;
        let room = self
            .registry
            .get_room(&room_id)
            .ok_or_else(|| RelayError::RoomNotFound(room_id.clone()))?;

        if self.remove_from_room(&room, &user_id, None).await {
            info!(room = %room_id, %user_id, "Participant left");
        }
        Ok(())
    }

    async fn handle_publish(
        &self,
        channel: &SessionChannel,
        req: PublishRequest,
    ) -> Result<(), RelayError> {
        let PublishRequest {
            room_id,
            user_id,
            jsep,
        } = req;
        let room = self.enter_room(
            &room_id,
            Participant::new(user_id.clone(), channel.clone()),
            false,
        );

        let peer = room.activate_publisher(&user_id);
        let answer = match room.negotiate_sender(&user_id, jsep.sdp).await {
            Ok(answer) => answer,
            Err(e) => {
                room.release_peer_if_current(&user_id, PeerRole::Publisher, &peer)
                    .await;
                return Err(e);
            }
        };

        let msg = ServerMessage::published(user_id.clone(), answer);
        room.notify_one(&user_id, &msg);
        let notified = room.notify_others(&user_id, &msg);

        info!(room = %room_id, %user_id, notified, "Publisher active");
        Ok(())
    }

    async fn handle_subscribe(
        &self,
        channel: &SessionChannel,
        req: SubscribeRequest,
    ) -> Result<(), RelayError> {
        let SubscribeRequest {
            room_id,
            user_id,
            pub_id,
            jsep,
        } = req;
        let room = self.enter_room(
            &room_id,
            Participant::new(user_id.clone(), channel.clone()),
            false,
        );

        let peer = room.activate_subscriber(&user_id);
        let answer = match room.negotiate_receiver(&user_id, &pub_id, jsep.sdp).await {
            Ok(answer) => answer,
            Err(e) => {
                room.release_peer_if_current(&user_id, PeerRole::Subscriber, &peer)
                    .await;
                return Err(e);
            }
        };

        let refreshed = room.request_keyframe_from_all_except(&user_id).await;
        room.notify_one(
            &user_id,
            &ServerMessage::subscribed(user_id.clone(), pub_id.clone(), answer),
        );

        info!(room = %room_id, %user_id, publisher = %pub_id, refreshed, "Subscriber active");
        Ok(())
    }

    /// Removes a participant and its peers from `room`.
    ///
    /// With `bound_to`, nothing happens unless the participant is still bound
    /// to that channel. `onUnpublish` goes out only from the call that
    /// actually removed the participant. Returns whether it did.
    async fn remove_from_room(
        &self,
        room: &Room,
        user_id: &UserId,
        bound_to: Option<ConnectionId>,
    ) -> bool {
        let removed = match bound_to {
            Some(connection) => room.remove_participant_bound_to(user_id, connection),
            None => room.remove_participant(user_id),
        };
        if removed.is_none() && bound_to.is_some() {
            return false;
        }

        room.release_peer(user_id, PeerRole::Publisher).await;
        if removed.is_some() {
            room.notify_others(user_id, &ServerMessage::unpublished(user_id.clone()));
        }
        room.release_peer(user_id, PeerRole::Subscriber).await;

        self.registry.evict_if_empty(room.id()).await;
        removed.is_some()
    }
}
