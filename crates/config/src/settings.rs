//! Main settings module.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{audio, conversation};
use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Audio pipeline tunables (spec §4.B "Parameters").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: u32,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u32,
    #[serde(default = "default_wake_timeout_secs")]
    pub wake_timeout_secs: f32,
    #[serde(default = "default_silence_timeout_secs")]
    pub silence_timeout_secs: f32,
    #[serde(default = "default_min_speech_secs")]
    pub min_speech_secs: f32,
    #[serde(default = "default_vad_aggressiveness")]
    pub vad_aggressiveness: u8,
    #[serde(default = "default_wake_word_sensitivity")]
    pub wake_word_sensitivity: f32,
    #[serde(default = "default_enhanced_vad_enabled")]
    pub enhanced_vad_enabled: bool,
}

fn default_sample_rate_hz() -> u32 {
    audio::SAMPLE_RATE_HZ
}
fn default_frame_ms() -> u32 {
    audio::FRAME_MS
}
fn default_wake_timeout_secs() -> f32 {
    audio::WAKE_TIMEOUT_SECS
}
fn default_silence_timeout_secs() -> f32 {
    audio::SILENCE_TIMEOUT_SECS
}
fn default_min_speech_secs() -> f32 {
    audio::MIN_SPEECH_SECS
}
fn default_vad_aggressiveness() -> u8 {
    1
}
fn default_wake_word_sensitivity() -> f32 {
    0.5
}
fn default_enhanced_vad_enabled() -> bool {
    true
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate_hz(),
            frame_ms: default_frame_ms(),
            wake_timeout_secs: default_wake_timeout_secs(),
            silence_timeout_secs: default_silence_timeout_secs(),
            min_speech_secs: default_min_speech_secs(),
            vad_aggressiveness: default_vad_aggressiveness(),
            wake_word_sensitivity: default_wake_word_sensitivity(),
            enhanced_vad_enabled: default_enhanced_vad_enabled(),
        }
    }
}

/// Embedded-store location and conversation-core defaults (spec §4.C/§4.D/§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "default_context_message_count")]
    pub context_message_count: usize,
    #[serde(default = "default_top_memories")]
    pub top_memories: usize,
    #[serde(default = "default_response_cache_ttl_hours")]
    pub response_cache_ttl_hours: i64,
}

fn default_data_dir() -> String {
    "data".to_string()
}
fn default_cache_dir() -> String {
    "cache".to_string()
}
fn default_context_message_count() -> usize {
    conversation::CONTEXT_MESSAGE_COUNT
}
fn default_top_memories() -> usize {
    conversation::TOP_MEMORIES
}
fn default_response_cache_ttl_hours() -> i64 {
    conversation::RESPONSE_CACHE_TTL_HOURS
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache_dir: default_cache_dir(),
            context_message_count: default_context_message_count(),
            top_memories: default_top_memories(),
            response_cache_ttl_hours: default_response_cache_ttl_hours(),
        }
    }
}

/// Thin external adapter's bind address — the wire surface itself is out of
/// scope (spec §1), this only lets `avatar-server` bind somewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Top-level application settings, assembled by [`load_settings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.pipeline.wake_word_sensitivity) {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.wake_word_sensitivity".to_string(),
                message: format!(
                    "must be between 0.0 and 1.0, got {}",
                    self.pipeline.wake_word_sensitivity
                ),
            });
        }
        if self.pipeline.vad_aggressiveness > 3 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.vad_aggressiveness".to_string(),
                message: format!("must be in 0..=3, got {}", self.pipeline.vad_aggressiveness),
            });
        }
        Ok(())
    }
}

/// Load settings from files and environment.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`AVATAR_` prefix)
/// 2. `config/{env}.yaml` (if `env` specified)
/// 3. `config/default.yaml`
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("AVATAR")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert!(settings.pipeline.enhanced_vad_enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_sensitivity() {
        let mut settings = Settings::default();
        settings.pipeline.wake_word_sensitivity = 1.5;
        assert!(settings.validate().is_err());
    }
}
