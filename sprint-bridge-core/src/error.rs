//! Error types for the stream bridge

use std::io;
use thiserror::Error;

use crate::bridge::BridgeState;

/// Result type for stream bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for stream bridge operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while writing to or reading from a pipe
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// The pipe handles could not be used for the handshake
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// A lifecycle operation was called out of order
    #[error("Cannot {operation} while bridge is {state}")]
    InvalidState {
        /// Operation that was attempted
        operation: &'static str,
        /// State the bridge was in
        state: BridgeState,
    },

    /// Features are not a `[input_dim, frames]` matrix
    #[error("Shape mismatch: expected features shaped [{expected}, frames], got {shape:?}")]
    ShapeMismatch {
        /// Input dimension sent in the handshake
        expected: usize,
        /// Shape of the rejected array
        shape: Vec<usize>,
    },

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed frame on the consumer side
    #[error("Protocol error: {0}")]
    Protocol(String),
}
