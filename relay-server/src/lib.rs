pub mod config;
pub mod context;
pub mod error;
pub mod peer;
pub mod room;
pub mod signaling;

pub use config::*;
pub use context::*;
pub use error::*;
pub use peer::*;
pub use room::*;
pub use signaling::*;
