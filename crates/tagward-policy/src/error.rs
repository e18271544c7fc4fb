use thiserror::Error;

/// Errors from policy configuration and audit log export.
///
/// Evaluating a successful physical read never produces one of these.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("audit chain broken at entry {0}")]
    ChainBroken(usize),
}

pub type PolicyResult<T> = Result<T, PolicyError>;
