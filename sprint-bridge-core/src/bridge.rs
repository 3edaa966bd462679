//! Producer side of the extern dataset pipe
//!
//! A [`StreamBridge`] owns both pipe ends for its whole lifetime and drives
//! the three-phase protocol: one `init` handshake, any number of `data`
//! messages, one `exit`. Every message is flushed as soon as it is written;
//! a full pipe blocks the producer until the consumer drains it.

use std::fmt;
use std::io::{Read, Write};

use tracing::{debug, error, info, warn};

use crate::codec::FrameWriter;
use crate::error::{Error, Result};
use crate::message::{DataPayload, InitPayload, StreamMessage};
use crate::tensor::DenseTensor;

/// Lifecycle state of a bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Handshake not sent yet
    Uninitialized,
    /// Handshake sent, data may flow
    Streaming,
    /// Exit sent and handles released
    Closed,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgeState::Uninitialized => "uninitialized",
            BridgeState::Streaming => "streaming",
            BridgeState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Counters for what a bridge has sent so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Number of `data` messages sent
    pub data_messages: u64,
    /// Bytes written to the outbound pipe, framing included
    pub bytes_written: u64,
}

/// Sends features and targets to the consumer process
pub struct StreamBridge<W: Write, R: Read> {
    /// Outbound (child-to-parent) end, `None` once released
    writer: Option<FrameWriter<W>>,

    /// Inbound (parent-to-child) end, held for the lifetime of the stream
    inbound: Option<R>,

    /// Parameters sent in the handshake
    params: InitPayload,

    /// Current lifecycle state
    state: BridgeState,

    /// Data message count
    data_messages: u64,
}

impl<W: Write, R: Read> StreamBridge<W, R> {
    /// Take ownership of both pipe ends and send the `init` handshake
    ///
    /// `num_segments` is advisory; pass `None` when the count is unknown.
    pub fn open(
        outbound: W,
        inbound: R,
        input_dim: u32,
        output_dim: u32,
        num_segments: Option<u64>,
    ) -> Result<Self> {
        if input_dim == 0 || output_dim == 0 {
            return Err(Error::InvalidArgument(format!(
                "input_dim and output_dim must be positive, got {input_dim} and {output_dim}"
            )));
        }

        let params = InitPayload {
            input_dim,
            output_dim,
            num_segments,
        };
        let mut bridge = Self {
            writer: Some(FrameWriter::new(outbound)),
            inbound: Some(inbound),
            params,
            state: BridgeState::Uninitialized,
            data_messages: 0,
        };

        bridge
            .send(&StreamMessage::Init(params))
            .map_err(|e| Error::Handshake(format!("init message could not be sent: {e}")))?;
        bridge.state = BridgeState::Streaming;

        info!(input_dim, output_dim, ?num_segments, "extern dataset stream opened");
        Ok(bridge)
    }

    /// Send one segment of features with optional per-frame targets
    ///
    /// `features` must be two-dimensional with the handshake's `input_dim`
    /// rows; otherwise nothing is written. An I/O failure while writing
    /// releases both pipe ends and leaves the bridge `Closed`.
    pub fn send_data(&mut self, features: DenseTensor, targets: Option<DenseTensor>) -> Result<()> {
        self.expect_state(BridgeState::Streaming, "send data")?;

        let expected = self.params.input_dim as usize;
        if features.ndim() != 2 || features.rows() != Some(expected) {
            return Err(Error::ShapeMismatch {
                expected,
                shape: features.shape().to_vec(),
            });
        }

        debug!(
            shape = ?features.shape(),
            dtype = %features.dtype(),
            has_targets = targets.is_some(),
            "sending data"
        );
        self.send(&StreamMessage::Data(DataPayload { features, targets }))?;
        self.data_messages += 1;

        if let Some(hint) = self.params.num_segments {
            if self.data_messages == hint + 1 {
                warn!(
                    num_segments = hint,
                    "more segments streamed than announced in the handshake"
                );
            }
        }
        Ok(())
    }

    /// Send `exit` and release both pipe ends
    ///
    /// The handles are released even if the exit message cannot be written.
    /// Closing twice is an error.
    pub fn close(&mut self) -> Result<()> {
        if self.state == BridgeState::Closed {
            return Err(Error::InvalidState {
                operation: "close",
                state: self.state,
            });
        }

        let result = self.send(&StreamMessage::Exit);
        let bytes_written = self.writer.as_ref().map_or(0, FrameWriter::bytes_written);
        self.release();

        info!(
            data_messages = self.data_messages,
            bytes_written, "extern dataset stream closed"
        );
        result
    }

    /// Current lifecycle state
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// What has been sent so far
    pub fn stats(&self) -> StreamStats {
        StreamStats {
            data_messages: self.data_messages,
            bytes_written: self.writer.as_ref().map_or(0, FrameWriter::bytes_written),
        }
    }

    fn expect_state(&self, expected: BridgeState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn release(&mut self) {
        self.writer = None;
        self.inbound = None;
        self.state = BridgeState::Closed;
    }

    /// Write one message; a failed pipe write is terminal
    fn send(&mut self, message: &StreamMessage) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::InvalidState {
            operation: "write",
            state: self.state,
        })?;
        match writer.write_message(message) {
            Ok(_) => Ok(()),
            Err(err @ Error::Io(_)) => {
                // A partial frame may be on the wire; nothing after it can be decoded
                error!(tag = %message.tag(), error = %err, "outbound pipe write failed");
                self.release();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

impl<W: Write, R: Read> Drop for StreamBridge<W, R> {
    fn drop(&mut self) {
        if self.state == BridgeState::Streaming {
            warn!("stream bridge dropped without exit; consumer will see a truncated stream");
        }
    }
}

impl<W: Write, R: Read> fmt::Debug for StreamBridge<W, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBridge")
            .field("params", &self.params)
            .field("state", &self.state)
            .field("data_messages", &self.data_messages)
            .finish_non_exhaustive()
    }
}
