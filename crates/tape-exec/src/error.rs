//! Error types for order execution.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// The broker rejected the request. `detail` is the broker's own
    /// human-readable message, passed through verbatim.
    #[error("broker rejected request ({status}): {detail}")]
    Broker { status: u16, detail: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Submit requested with no active accounts selected.
    #[error("no active accounts selected")]
    NoActiveAccounts,

    /// Operation invalid for the current placement phase.
    #[error("invalid placement state: {0}")]
    InvalidState(String),
}

impl ExecError {
    /// The message shown to the user for a failed unit of work.
    pub fn detail(&self) -> String {
        match self {
            Self::Broker { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
