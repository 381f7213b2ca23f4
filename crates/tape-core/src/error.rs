//! Core error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A price or quantity string failed to parse.
    #[error("invalid decimal: {0}")]
    Decimal(#[from] rust_decimal::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
