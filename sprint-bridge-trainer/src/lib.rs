//! Sprint trainer interface for the extern dataset bridge
//!
//! Sprint drives a trainer through `init`, a series of feed calls, and
//! `exit`. This crate maps those calls onto a
//! [`StreamBridge`](sprint_bridge_core::StreamBridge): `init` parses the
//! configuration and opens the pipes, feeds become `data` messages, and
//! `exit` closes the stream.

#![warn(missing_docs)]

pub mod config;
mod error;
pub mod feed;
pub mod trainer;

pub use config::{BridgeConfig, TargetMode, EXPECTED_ACTION};
pub use error::{Error, Result};
pub use feed::FeedRequest;
pub use trainer::{SprintTrainer, TrainerParams};

// Re-export core types
pub use sprint_bridge_core::{
    BridgeState, DenseTensor, SegmentOrderRegistry, StreamMessage, StreamStats,
};
