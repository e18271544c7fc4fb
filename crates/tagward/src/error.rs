use thiserror::Error;

/// Error type for the Tagward root binary, aggregating errors from the
/// core, policy and vault crates.
#[derive(Debug, Error)]
pub enum RootError {
    #[error("{0}")]
    Core(#[from] tagward_core::TagwardError),

    #[error("policy error: {0}")]
    Policy(#[from] tagward_policy::PolicyError),

    #[error("vault error: {0}")]
    Vault(#[from] tagward_vault::VaultError),

    #[error("unknown device: {0}")]
    UnknownDevice(String),

    #[error("unknown credential: {0}")]
    UnknownCredential(String),

    #[error("invalid attempt: {0}")]
    InvalidAttempt(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RootError {
    fn from(e: serde_json::Error) -> Self {
        RootError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for RootError {
    fn from(e: toml::de::Error) -> Self {
        RootError::Config(format!("TOML parse error: {}", e))
    }
}

pub type RootResult<T> = Result<T, RootError>;
