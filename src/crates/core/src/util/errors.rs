//! Error taxonomy of the turn engine.

use thiserror::Error;

pub type MultichatResult<T> = Result<T, MultichatError>;

#[derive(Debug, Error)]
pub enum MultichatError {
    /// Network error, non-2xx status, idle timeout or a stream that ended
    /// before the turn settled.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Attachment upload failed before any chat request was issued.
    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Turn cancelled")]
    Cancelled,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl MultichatError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<toml::de::Error> for MultichatError {
    fn from(error: toml::de::Error) -> Self {
        Self::Config(error.to_string())
    }
}
