mod channel;
mod peer;
mod room;
mod signaling;

pub use channel::ConnectionId;
pub use peer::UserId;
pub use room::RoomId;
pub use signaling::{
    DecodeError, Jsep, JoinStatus, PublishRequest, RoomRequest, SdpKind, ServerMessage,
    SignalMessage, SubscribeRequest,
};
