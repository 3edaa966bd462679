//! Error types for the trainer lifecycle

use thiserror::Error;

/// Error type for trainer lifecycle calls
#[derive(Error, Debug)]
pub enum Error {
    /// Stream bridge error
    #[error("Bridge error: {0}")]
    Core(#[from] sprint_bridge_core::Error),

    /// Malformed or contradictory configuration string
    #[error("Config error: {0}")]
    Config(String),

    /// Target mode the bridge cannot serve
    #[error("Unsupported target mode: {0}")]
    UnsupportedMode(String),

    /// Feed variant without an implementation
    #[error("Feature not implemented: {0}")]
    NotImplemented(String),
}

/// Result type for trainer lifecycle calls
pub type Result<T> = std::result::Result<T, Error>;
