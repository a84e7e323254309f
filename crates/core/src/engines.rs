//! Pluggable engine interfaces (spec §4.A).
//!
//! The pipeline and conversation core depend on these traits, never on a
//! concrete engine implementation, so that a host can swap in heavier or
//! lighter variants per [`EngineResourceProfile`] without touching the rest
//! of the runtime.

use async_trait::async_trait;

use crate::error::EngineError;

/// Approximate resource footprint an engine advertises so the Host Profile
/// Detector (§4.G) can pick a variant that fits the current machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineResourceProfile {
    pub approx_ram_mb: u32,
    pub approx_cpu_cores: f32,
    pub needs_gpu: bool,
}

/// `is_speech(frame) -> bool` over fixed-size frames (10/20/30 ms at 16 kHz
/// mono int16). Implementations may be stateless between calls.
pub trait VoiceActivityDetector: Send + Sync {
    fn is_speech(&self, frame: &[i16]) -> Result<bool, EngineError>;

    /// VAD aggressiveness in `{0,1,2,3}`; adjustments take effect at the
    /// next frame boundary, not mid-frame.
    fn set_aggressiveness(&mut self, level: u8);

    fn resource_profile(&self) -> EngineResourceProfile;
}

/// `detect(window) -> optional<word>` over the trailing 2-3 s of audio.
pub trait WakeWordMatcher: Send + Sync {
    fn detect(&self, window: &[i16]) -> Result<Option<String>, EngineError>;

    /// Sensitivity in `[0,1]`; adjustments take effect at the next frame
    /// boundary.
    fn set_sensitivity(&mut self, sensitivity: f32);

    fn resource_profile(&self) -> EngineResourceProfile;
}

/// Result of a completed transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub confidence: f32,
    pub language: String,
    pub latency_ms: u64,
}

/// `transcribe(pcm_bytes) -> {text, confidence, language, latency}`.
///
/// May fail with [`EngineError::EngineUnavailable`] or
/// [`EngineError::DecodeFailed`] (very short audio, silence misclassified).
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, pcm_samples: &[i16]) -> Result<Transcript, EngineError>;

    fn resource_profile(&self) -> EngineResourceProfile;
}

/// Sampling parameters for a single `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.8,
            top_p: 0.95,
            stop_sequences: vec!["Human:".into(), "Assistant:".into(), "\n\n".into()],
        }
    }
}

/// `generate(prompt, params) -> text`, with an optional streaming variant
/// producing a finite, non-restartable sequence of token strings.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, EngineError>;

    /// Streaming generation. The default implementation falls back to a
    /// single-shot [`LanguageModel::generate`] call wrapped as a one-element
    /// stream; engines that support true token streaming should override
    /// this.
    async fn generate_stream(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Vec<String>, EngineError> {
        Ok(vec![self.generate(prompt, params).await?])
    }

    fn resource_profile(&self) -> EngineResourceProfile;
}

/// Voice/expression parameters for a single `synthesize` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SynthesisParams {
    pub emotion: Option<String>,
    pub intensity: Option<f32>,
    pub voice: Option<String>,
}

/// `synthesize(text, params) -> pcm_samples` at a declared sample rate.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str, params: &SynthesisParams) -> Result<Vec<i16>, EngineError>;

    fn sample_rate_hz(&self) -> u32;

    fn resource_profile(&self) -> EngineResourceProfile;
}
