use thiserror::Error;

pub type RxResult<T> = Result<T, RxError>;

#[derive(Error, Debug)]
pub enum RxError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Activity cache error: {0}")]
    Cache(String),

    #[error("Session state error: {0}")]
    Session(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
