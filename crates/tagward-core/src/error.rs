use thiserror::Error;

#[derive(Debug, Error)]
pub enum TagwardError {
    #[error("invalid device: {0}")]
    InvalidDevice(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type TagwardResult<T> = Result<T, TagwardError>;
