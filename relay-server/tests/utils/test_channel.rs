use axum::extract::ws::Message;
use relay_core::{ConnectionId, ServerMessage};
use relay_server::SessionChannel;
use tokio::sync::mpsc;

/// A signaling channel whose outbound side is captured for assertions.
pub struct TestChannel {
    pub channel: SessionChannel,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl TestChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            channel: SessionChannel::new(tx),
            rx,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.channel.id()
    }

    /// Everything delivered so far, in order.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            if let Some(decoded) = decode(msg) {
                messages.push(decoded);
            }
        }
        messages
    }

    /// Simulates the socket going away: later deliveries are dropped.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Default for TestChannel {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(msg: Message) -> Option<ServerMessage> {
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).ok(),
        _ => None,
    }
}
