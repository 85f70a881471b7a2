//! Error types for the generation crate

use thiserror::Error;

/// Result type alias using GenerationError
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors from generation backend interaction and job management
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// Backend submit or poll call failed
    #[error("backend error: {0}")]
    Backend(String),

    /// Backend returned a response the core could not interpret
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    /// Prompt enhancement failed (recoverable; callers fall back to the
    /// original prompt)
    #[error("prompt enhancement failed: {0}")]
    Enhancement(String),

    /// Reference media upload failed
    #[error("media upload failed: {0}")]
    Upload(String),

    /// The job reached the poll attempt limit without a terminal status
    #[error("generation timed out after {attempts} poll attempts")]
    Timeout { attempts: u32 },

    /// The backend reported completion but produced no media
    #[error("backend completed without producing any media")]
    EmptyResult,

    /// The job was cancelled cooperatively
    #[error("generation cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Create a backend error with a message
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
