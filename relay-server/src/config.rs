//! Server configuration.
//!
//! Every option can be given on the command line or through a `RELAY_*`
//! environment variable.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// How long a subscriber waits for the publisher's tracks before binding anyway.
pub const DEFAULT_TRACK_WAIT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Parser)]
#[command(name = "relay-server", version, about = "Selective forwarding relay signaling server")]
pub struct ServerConfig {
    /// Address the signaling WebSocket listens on.
    #[arg(long, env = "RELAY_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// STUN/TURN urls handed to every peer connection.
    #[arg(
        long = "ice-server",
        env = "RELAY_ICE_SERVERS",
        value_delimiter = ',',
        default_value = DEFAULT_STUN_SERVER
    )]
    pub ice_servers: Vec<String>,

    #[arg(long, env = "RELAY_TURN_USERNAME")]
    pub turn_username: Option<String>,

    #[arg(long, env = "RELAY_TURN_CREDENTIAL")]
    pub turn_credential: Option<String>,

    /// Ceiling for the subscriber-side wait on publisher tracks, in milliseconds.
    #[arg(
        long,
        env = "RELAY_TRACK_WAIT_MS",
        default_value_t = DEFAULT_TRACK_WAIT.as_millis() as u64
    )]
    pub track_wait_ms: u64,

    /// Gather host candidates on loopback interfaces too.
    #[arg(long, env = "RELAY_INCLUDE_LOOPBACK")]
    pub include_loopback: bool,
}

impl ServerConfig {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            ice_servers: self.ice_servers.clone(),
            username: self.turn_username.clone(),
            credential: self.turn_credential.clone(),
            include_loopback: self.include_loopback,
        }
    }

    pub fn track_wait(&self) -> Duration {
        Duration::from_millis(self.track_wait_ms)
    }
}

/// ICE settings for the WebRTC transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub ice_servers: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
    pub include_loopback: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_owned()],
            username: None,
            credential: None,
            include_loopback: false,
        }
    }
}
