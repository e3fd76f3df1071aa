use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerdinError {
    // Model errors
    #[error("Model request failed: {0}")]
    ModelRequest(String),

    #[error("Model streaming error: {0}")]
    ModelStream(String),

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Operation not found: {tool}::{operation}")]
    OperationNotFound { tool: String, operation: String },

    #[error("Tool execution failed: {tool}: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Malformed tool definition: {0}")]
    Definition(String),

    // Workflow errors
    #[error("Workflow error: {0}")]
    Workflow(String),

    // Run errors
    #[error("Step cancelled")]
    Cancelled,

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VerdinError>;
