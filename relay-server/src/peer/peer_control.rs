use crate::peer::MediaSources;
use async_trait::async_trait;
use relay_core::UserId;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum PeerRole {
    /// Sends media into the relay.
    Publisher,
    /// Receives one publisher's media from the relay.
    Subscriber,
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerRole::Publisher => f.write_str("publisher"),
            PeerRole::Subscriber => f.write_str("subscriber"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("transport error: {0}")]
    Transport(#[from] webrtc::Error),

    #[error("peer has been stopped")]
    Stopped,

    #[error("peer has already negotiated")]
    AlreadyNegotiated,

    #[error("peer connection has no local description")]
    MissingLocalDescription,

    #[error("operation not valid for a {0} peer")]
    WrongRole(PeerRole),
}

/// Narrow control surface over one media transport, as seen by a room.
///
/// Implementations must be cheap to construct: the connection itself is
/// established during negotiation.
#[async_trait]
pub trait PeerControl: Send + Sync {
    fn user_id(&self) -> &UserId;

    fn role(&self) -> PeerRole;

    /// Shared track indirections. Publishers populate them, subscribers bind to them.
    fn media_sources(&self) -> MediaSources;

    /// Accept a publisher's offer. Returns the SDP answer.
    async fn negotiate_as_sender(&self, offer: String) -> Result<String, PeerError>;

    /// Accept a subscriber's offer, forwarding whatever `sources` carry now or later.
    async fn negotiate_as_receiver(
        &self,
        offer: String,
        sources: MediaSources,
    ) -> Result<String, PeerError>;

    /// Ask the remote sender for a fresh keyframe. No-op for subscribers.
    async fn request_keyframe(&self);

    /// Stop forwarding. Idempotent, never blocks.
    fn stop(&self);

    /// Tear down the underlying connection if one was established. Idempotent.
    async fn close_transport(&self);
}

pub trait PeerFactory: Send + Sync {
    fn create(&self, user_id: &UserId, role: PeerRole) -> Arc<dyn PeerControl>;
}
