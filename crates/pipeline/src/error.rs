use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum PipelineError {
    #[error("illegal transition: {event} is not valid from {state:?}")]
    IllegalTransition { state: crate::state_machine::PipelineState, event: String },

    #[error(transparent)]
    Engine(#[from] avatar_core::EngineError),
}
