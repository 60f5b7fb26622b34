//! Error types for the inspector core

use thiserror::Error;

/// Result type for inspector operations
pub type Result<T> = std::result::Result<T, InspectorError>;

/// Inspector core errors
#[derive(Error, Debug)]
pub enum InspectorError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Mutation rejected at `{path}`: {message}")]
    MutationRejected { path: String, message: String },

    #[error("Entity {0} no longer exists")]
    EntityMissing(u64),

    #[error("Invalid value path `{path}`: {message}")]
    InvalidPath { path: String, message: String },

    #[error("Value at `{0}` is not editable")]
    NotEditable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InspectorError {
    /// Shorthand for transport-level failures surfaced by a client implementation.
    pub fn transport(message: impl Into<String>) -> Self {
        InspectorError::Transport(message.into())
    }
}
