use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("failed to parse motion file: {0}")]
    DecodeFailed(String),

    #[error("failed to parse avatar manifest: {0}")]
    InvalidManifest(String),
}
