//! Core traits and types for the avatar runtime.
//!
//! This crate provides the foundational vocabulary shared by every other
//! crate in the workspace:
//! - the [`InteractionKey`] isolation unit and the entity types that hang off it
//! - the pluggable engine traits (VAD, wake word, STT, LLM, TTS) of §4.A
//! - the shared error taxonomy of §7

pub mod engines;
pub mod entities;
pub mod error;
pub mod key;
pub mod sentiment;

pub use engines::{
    EngineResourceProfile, GenerationParams, LanguageModel, SpeechToText, SynthesisParams,
    TextToSpeech, Transcript, VoiceActivityDetector, WakeWordMatcher,
};
pub use entities::{
    AvatarModel, AvatarState, BondingProgress, ConversationMessage, KeyFields, MemoryItem,
    MemoryType, PersonalityState, RelationshipStage, Role, User,
};
pub use error::{EngineError, ErrorKind};
pub use key::InteractionKey;
pub use sentiment::{analyze_emotional_tone, EmotionalTone};
