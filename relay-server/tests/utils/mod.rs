pub mod signal_helpers;
pub mod test_channel;

pub use mock_peer::*;
pub use signal_helpers::*;
pub use test_channel::*;
pub use test_client::*;
