//! Error types for the terrain engine

use thiserror::Error;

use crate::expr::ExprError;

/// Main error type for the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expression error: {0}")]
    Expression(#[from] ExprError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Preset error: {0}")]
    Preset(String),

    #[error("Renderer error: {0}")]
    Renderer(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Streaming error: {0}")]
    Streaming(String),
}
