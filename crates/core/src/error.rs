//! Shared error taxonomy (spec §7).
//!
//! `EngineError` is the common currency between the engine traits in
//! [`crate::engines`] and every component that calls them. Individual crates
//! still define their own richer error enums (`PipelineError`, `StoreError`,
//! ...) but convert engine-level failures into this shape first so that the
//! bus can report them uniformly as `error` events.

use thiserror::Error;

/// The coarse error kinds named in spec §7, used for tagging `error` bus
/// events and for dispatch decisions (fallback, retry, canned response).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EngineUnavailable,
    DecodeFailed,
    Timeout,
    InvalidKey,
    Overflow,
    InvariantViolation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EngineUnavailable => "engine_unavailable",
            Self::DecodeFailed => "decode_failed",
            Self::Timeout => "timeout",
            Self::InvalidKey => "invalid_key",
            Self::Overflow => "overflow",
            Self::InvariantViolation => "invariant_violation",
        }
    }
}

/// Error surface shared by the VAD, wake-word, STT, LLM and TTS engine
/// traits. Never propagates as an unstructured error into the pipeline —
/// callers match on the variant and apply the fallback/retry/canned-response
/// policy spec'd for that kind.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("decode failed: {0}")]
    DecodeFailed(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("invalid interaction key: {0}")]
    InvalidKey(String),

    #[error("bounded queue overflowed: {0}")]
    Overflow(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EngineUnavailable(_) => ErrorKind::EngineUnavailable,
            Self::DecodeFailed(_) => ErrorKind::DecodeFailed,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::InvalidKey(_) => ErrorKind::InvalidKey,
            Self::Overflow(_) => ErrorKind::Overflow,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
        }
    }
}
