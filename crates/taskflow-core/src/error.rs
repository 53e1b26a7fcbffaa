//! Centralized error types for TaskFlow.

use thiserror::Error;

/// Main error type for store operations.
#[derive(Error, Debug)]
pub enum TaskflowError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Stored session is unreadable: {0}")]
    StorageCorruption(String),

    #[error("Storage error: {0}")]
    Storage(#[from] taskflow_storage::StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No active session")]
    NotAuthenticated,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for store operations.
pub type TaskflowResult<T> = Result<T, TaskflowError>;

impl TaskflowError {
    /// Create an authentication error.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProjectNotFound(_))
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
