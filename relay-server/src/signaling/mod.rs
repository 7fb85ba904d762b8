mod dispatcher;
mod session_channel;
mod ws_handler;

pub use dispatcher::*;
pub use session_channel::*;
pub use ws_handler::*;
