//! Audio Pipeline (spec §4.B): a state machine composing VAD, wake-word
//! matching, and STT into one cooperating unit with fallback semantics.

pub mod engines;
pub mod error;
pub mod pipeline;
pub mod ring_buffer;
pub mod state_machine;
pub mod vad;

pub use engines::{EchoLanguageModel, EnergyVad, KeywordWakeWord, NullStt, NullTts};
pub use error::PipelineError;
pub use pipeline::{PipelineConfig, VoicePipeline};
pub use ring_buffer::RingBuffer;
pub use state_machine::{PipelineEvent, PipelineState};
pub use vad::EnhancedOrBasicVad;

/// Boxed [`avatar_core::WakeWordMatcher`], held by the consumer worker.
pub type WakeWordMatcherHandle = Box<dyn avatar_core::WakeWordMatcher>;
