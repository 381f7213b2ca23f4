//! Error types for WebSocket connections.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("connection closed by server: {code} {reason}")]
    ConnectionClosed { code: u16, reason: String },

    /// Reconnection budget spent. Terminal for this account until the
    /// caller connects again explicitly.
    #[error("reconnection failed after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("no connection for account {0}")]
    NotConnected(String),
}

pub type WsResult<T> = Result<T, WsError>;
