use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("key file missing: {0}")]
    KeyFileMissing(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("encryption error: {0}")]
    Encryption(String),

    /// Deliberately carries no detail: wrong key and tampered token look
    /// the same to the caller.
    #[error("decryption failed: wrong key or corrupted data")]
    Decryption,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<VaultError> for tagward_core::TagwardError {
    fn from(e: VaultError) -> Self {
        tagward_core::TagwardError::Crypto(e.to_string())
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
