use crate::peer::{PeerError, PeerRole};
use relay_core::{DecodeError, RoomId, UserId};
use thiserror::Error;

/// Everything that can make the dispatcher drop a signaling message.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("publisher {0} not found")]
    PublisherNotFound(UserId),

    #[error("no active {role} peer for {user_id}")]
    PeerNotActive { user_id: UserId, role: PeerRole },

    #[error("negotiation failed for {user_id}: {source}")]
    Negotiation {
        user_id: UserId,
        #[source]
        source: PeerError,
    },
}
