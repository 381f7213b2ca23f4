//! Application-level errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Exec(#[from] tape_exec::ExecError),

    #[error(transparent)]
    Ws(#[from] tape_ws::WsError),
}

pub type AppResult<T> = Result<T, AppError>;
