//! Layered runtime configuration for the avatar runtime.
//!
//! [`Settings`] is assembled from defaults, an optional YAML file, and
//! `AVATAR_`-prefixed environment variables — the same layering the teacher
//! uses for its own `Settings` struct. [`host_profile`] implements the Host
//! Profile Detector (spec §4.G).

pub mod constants;
pub mod host_profile;
pub mod settings;

pub use host_profile::{HostProfile, PerformanceTier};
pub use settings::{load_settings, PipelineSettings, RuntimeEnvironment, Settings, StoreSettings};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
