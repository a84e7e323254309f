//! Adapter-level error type (spec §7 `[ADD]`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("store error: {0}")]
    Store(#[from] avatar_store::StoreError),

    #[error("invalid interaction key: {0}")]
    InvalidKey(#[from] avatar_core::EngineError),

    #[error("session not found: {0}")]
    SessionNotFound(String),
}

impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ServerError::Store(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::InvalidKey(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::SessionNotFound(_) => axum::http::StatusCode::NOT_FOUND,
        };
        let body = axum::Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
