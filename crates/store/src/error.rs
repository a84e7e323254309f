use avatar_core::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid interaction key: {0}")]
    InvalidKey(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl From<EngineError> for StoreError {
    fn from(err: EngineError) -> Self {
        StoreError::InvalidKey(err.to_string())
    }
}
