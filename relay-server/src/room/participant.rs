use crate::signaling::SessionChannel;
use relay_core::{ConnectionId, ServerMessage, UserId};

/// A participant as known to one room: its identity and where to reach it.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: UserId,
    pub channel: SessionChannel,
}

impl Participant {
    pub fn new(id: UserId, channel: SessionChannel) -> Self {
        Self { id, channel }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.channel.id()
    }

    pub fn send(&self, msg: &ServerMessage) {
        self.channel.deliver(msg);
    }
}
