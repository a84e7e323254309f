use avatar_core::EngineError;
use avatar_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("LLM generation timed out")]
    Timeout,
}
