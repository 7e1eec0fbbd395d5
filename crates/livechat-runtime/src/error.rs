//! Error handling for the livechat runtime

use thiserror::Error;

/// Runtime-specific error types
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Connection closed")]
    Closed,

    #[error("No Tokio runtime available: {0}")]
    NoAsyncRuntime(String),

    #[error("Livechat core error: {0}")]
    Core(#[from] livechat_core::LivechatError),
}

impl RuntimeError {
    pub fn handshake(reason: impl Into<String>) -> Self {
        Self::Handshake(reason.into())
    }
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
