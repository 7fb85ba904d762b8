mod media_sources;
mod peer_control;
mod webrtc_peer;

pub use media_sources::*;
pub use peer_control::*;
pub use webrtc_peer::*;
