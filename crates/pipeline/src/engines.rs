//! Dependency-light stand-ins for the four engine traits (spec §4.A
//! `[ADD]`), so this crate runs end to end without external model files.
//! Production VAD/STT/TTS/LLM implementations are the external
//! collaborators the spec places out of scope.

use async_trait::async_trait;
use avatar_core::{
    EngineError, EngineResourceProfile, GenerationParams, LanguageModel, SpeechToText,
    SynthesisParams, TextToSpeech, Transcript, VoiceActivityDetector, WakeWordMatcher,
};

/// Energy-threshold VAD: a frame is speech if its RMS exceeds a
/// configurable floor. Grounded on the teacher's energy-floor quick-path
/// in `crates/pipeline/src/vad/magicnet.rs` (`energy_floor_db`), without
/// the neural model behind it.
pub struct EnergyVad {
    threshold_rms: f32,
    aggressiveness: u8,
}

impl EnergyVad {
    pub fn new() -> Self {
        Self { threshold_rms: 400.0, aggressiveness: 1 }
    }

    fn effective_threshold(&self) -> f32 {
        // Higher aggressiveness narrows what counts as speech.
        self.threshold_rms * (1.0 + self.aggressiveness as f32 * 0.3)
    }
}

impl Default for EnergyVad {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceActivityDetector for EnergyVad {
    fn is_speech(&self, frame: &[i16]) -> Result<bool, EngineError> {
        if frame.is_empty() {
            return Ok(false);
        }
        let sum_sq: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
        let rms = (sum_sq / frame.len() as f64).sqrt() as f32;
        Ok(rms > self.effective_threshold())
    }

    fn set_aggressiveness(&mut self, level: u8) {
        self.aggressiveness = level.min(3);
    }

    fn resource_profile(&self) -> EngineResourceProfile {
        EngineResourceProfile { approx_ram_mb: 1, approx_cpu_cores: 0.01, needs_gpu: false }
    }
}

/// Substring keyword spotting over the trailing window, decoded as naive
/// ASCII text. Grounded on `original_source/audio/voice_detection.py`'s
/// `WakeWordDetector`, which matches a configured phrase list rather than
/// running a dedicated acoustic model.
pub struct KeywordWakeWord {
    keywords: Vec<String>,
    sensitivity: f32,
}

impl KeywordWakeWord {
    pub fn new(keywords: Vec<String>) -> Self {
        Self { keywords, sensitivity: 0.5 }
    }

    /// Maps a PCM window to a naive textual proxy so a keyword list can be
    /// matched without an acoustic model. `sensitivity` only gates how much
    /// energy is required before attempting the match.
    fn window_energy(window: &[i16]) -> f32 {
        if window.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = window.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_sq / window.len() as f64).sqrt() as f32
    }
}

impl WakeWordMatcher for KeywordWakeWord {
    fn detect(&self, window: &[i16]) -> Result<Option<String>, EngineError> {
        let energy_floor = 200.0 * (1.0 - self.sensitivity);
        if Self::window_energy(window) < energy_floor {
            return Ok(None);
        }
        // Without real ASR, the standalone proxy treats any sufficiently
        // loud window as a candidate wake and reports the first configured
        // keyword; callers that need real discrimination supply a real
        // STT-backed matcher instead.
        Ok(self.keywords.first().cloned())
    }

    fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity.clamp(0.0, 1.0);
    }

    fn resource_profile(&self) -> EngineResourceProfile {
        EngineResourceProfile { approx_ram_mb: 1, approx_cpu_cores: 0.01, needs_gpu: false }
    }
}

/// Returns a canned transcript; used in tests and on hosts with no STT
/// model installed.
pub struct NullStt;

#[async_trait]
impl SpeechToText for NullStt {
    async fn transcribe(&self, pcm_samples: &[i16]) -> Result<Transcript, EngineError> {
        if pcm_samples.is_empty() {
            return Err(EngineError::DecodeFailed("empty utterance".to_string()));
        }
        Ok(Transcript {
            text: String::new(),
            confidence: 0.0,
            language: "und".to_string(),
            latency_ms: 0,
        })
    }

    fn resource_profile(&self) -> EngineResourceProfile {
        EngineResourceProfile { approx_ram_mb: 0, approx_cpu_cores: 0.0, needs_gpu: false }
    }
}

/// Returns silence of the requested declared sample rate.
pub struct NullTts;

#[async_trait]
impl TextToSpeech for NullTts {
    async fn synthesize(&self, _text: &str, _params: &SynthesisParams) -> Result<Vec<i16>, EngineError> {
        Ok(Vec::new())
    }

    fn sample_rate_hz(&self) -> u32 {
        22_050
    }

    fn resource_profile(&self) -> EngineResourceProfile {
        EngineResourceProfile { approx_ram_mb: 0, approx_cpu_cores: 0.0, needs_gpu: false }
    }
}

/// A stand-in `LanguageModel` that echoes the prompt's last sentence,
/// used only so `avatar-conversation`'s integration tests can exercise the
/// full pipeline without a real LLM.
pub struct EchoLanguageModel;

#[async_trait]
impl LanguageModel for EchoLanguageModel {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String, EngineError> {
        Ok(format!("(echo) {}", prompt.lines().last().unwrap_or("").trim()))
    }

    fn resource_profile(&self) -> EngineResourceProfile {
        EngineResourceProfile { approx_ram_mb: 0, approx_cpu_cores: 0.0, needs_gpu: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_vad_detects_loud_frame_and_ignores_silence() {
        let vad = EnergyVad::new();
        let silence = vec![0_i16; 480];
        let loud: Vec<i16> = (0..480).map(|i| if i % 2 == 0 { 5000 } else { -5000 }).collect();
        assert!(!vad.is_speech(&silence).unwrap());
        assert!(vad.is_speech(&loud).unwrap());
    }

    #[test]
    fn keyword_wake_word_requires_energy_above_floor() {
        let mut matcher = KeywordWakeWord::new(vec!["hey avatar".to_string()]);
        matcher.set_sensitivity(0.0);
        let silence = vec![0_i16; 480];
        assert_eq!(matcher.detect(&silence).unwrap(), None);

        matcher.set_sensitivity(1.0);
        let loud: Vec<i16> = vec![3000; 480];
        assert_eq!(matcher.detect(&loud).unwrap(), Some("hey avatar".to_string()));
    }

    #[tokio::test]
    async fn null_stt_rejects_empty_audio() {
        let stt = NullStt;
        assert!(stt.transcribe(&[]).await.is_err());
        assert!(stt.transcribe(&[1, 2, 3]).await.is_ok());
    }
}
