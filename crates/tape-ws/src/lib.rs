//! Per-account WebSocket connectivity to the broker proxy.
//!
//! Each trading account gets its own socket with heartbeat
//! acknowledgement, authentication on open, and bounded exponential
//! reconnection. Inbound frames are parsed into a closed message set
//! and republished on typed broadcast streams.

pub mod connection;
pub mod error;
pub mod events;
pub mod manager;
pub mod message;

pub use connection::{AccountConnection, ConnectionConfig, ConnectionInfo, ConnectionStatus};
pub use error::{WsError, WsResult};
pub use events::{EventHub, SocketEvent, UnknownEvent};
pub use manager::SocketManager;
pub use message::{parse_inbound, Authenticate, HeartbeatAck, Inbound};
