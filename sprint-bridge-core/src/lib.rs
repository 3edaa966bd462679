//! Wire protocol and producer-side stream bridge for the extern Sprint dataset
//!
//! A producer process streams feature sequences to a consumer over a pair of
//! inherited pipes. The protocol has three phases: an `init` handshake with
//! the stream parameters, a sequence of `data` messages, and a final `exit`.
//! This crate provides the message types, the framing shared by both ends,
//! the [`StreamBridge`] that drives the producer side, and the
//! [`SegmentOrderRegistry`] used to announce the expected segment count.

#![warn(missing_docs)]

pub mod bridge;
pub mod codec;
pub mod error;
#[cfg(unix)]
pub mod io;
pub mod message;
pub mod registry;
pub mod tensor;

// Re-export key types for convenience
pub use bridge::{BridgeState, StreamBridge, StreamStats};
pub use codec::{FrameReader, FrameWriter};
pub use error::{Error, Result};
pub use message::{DataPayload, InitPayload, MessageTag, StreamMessage};
pub use registry::SegmentOrderRegistry;
pub use tensor::{DType, DenseTensor, TensorType};
