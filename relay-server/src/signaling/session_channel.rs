use axum::extract::ws::Message;
use relay_core::{ConnectionId, ServerMessage};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Outbound half of one participant's signaling WebSocket.
#[derive(Debug, Clone)]
pub struct SessionChannel {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Message>,
}

impl SessionChannel {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: ConnectionId::new(),
            tx,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Serializes and queues one notification. A closed channel is not an error.
    pub fn deliver(&self, msg: &ServerMessage) {
        match msg.to_json() {
            Ok(json) => {
                if self.tx.send(Message::Text(json.into())).is_err() {
                    debug!(connection = %self.id, "Dropping message for closed channel");
                }
            }
            Err(e) => error!("Failed to serialize server message: {}", e),
        }
    }
}

impl PartialEq for SessionChannel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SessionChannel {}
