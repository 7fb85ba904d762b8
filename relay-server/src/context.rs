use crate::config::ServerConfig;
use crate::peer::{PeerFactory, WebRtcPeerFactory};
use crate::room::RoomRegistry;
use crate::signaling::{SignalingDispatcher, router};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;

/// Process-wide state shared by every signaling connection.
#[derive(Clone)]
pub struct RelayContext {
    registry: Arc<RoomRegistry>,
    dispatcher: SignalingDispatcher,
}

impl RelayContext {
    pub fn new(config: &ServerConfig) -> Self {
        let factory = WebRtcPeerFactory::new(config.transport());
        Self::from_factory(Arc::new(factory), config.track_wait())
    }

    pub fn from_factory(peer_factory: Arc<dyn PeerFactory>, track_wait: Duration) -> Self {
        let registry = Arc::new(RoomRegistry::with_track_wait(peer_factory, track_wait));
        let dispatcher = SignalingDispatcher::new(registry.clone());
        Self {
            registry,
            dispatcher,
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &SignalingDispatcher {
        &self.dispatcher
    }

    pub fn router(&self) -> Router {
        router(self.clone())
    }

    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}
