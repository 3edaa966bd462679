//! Trainer lifecycle: init, feed, exit
//!
//! Sprint initializes its trainer lazily, only after it has seen the first
//! data, and may have queried the segment order long before that. The host
//! therefore passes the registry explicitly to [`SprintTrainer::init`], which
//! is the only way to start a stream.

use std::fs::File;
use std::io::{Read, Write};

use sprint_bridge_core::io::open_pipe_pair;
use sprint_bridge_core::{BridgeState, SegmentOrderRegistry, StreamBridge, StreamStats};
use tracing::{debug, info};

use crate::config::{BridgeConfig, TargetMode};
use crate::error::{Error, Result};
use crate::feed::FeedRequest;

/// Arguments Sprint supplies when it initializes the trainer
#[derive(Debug, Clone, Copy)]
pub struct TrainerParams<'a> {
    /// Number of feature rows per frame
    pub input_dim: u32,
    /// Number of output classes
    pub output_dim: u32,
    /// Free-form configuration string, see [`BridgeConfig`]
    pub config: &'a str,
    /// Target mode name, e.g. `target-alignment`
    pub target_mode: &'a str,
}

/// A running extern dataset trainer
pub struct SprintTrainer<W: Write = File, R: Read = File> {
    bridge: StreamBridge<W, R>,
}

impl SprintTrainer {
    /// Validate the parameters, take the configured pipes and send the handshake
    ///
    /// The target mode and configuration are checked before any descriptor is
    /// touched. The segment count hint is the registry's current count.
    pub fn init(params: &TrainerParams<'_>, registry: &SegmentOrderRegistry) -> Result<Self> {
        info!(
            input_dim = params.input_dim,
            output_dim = params.output_dim,
            config = params.config,
            target_mode = params.target_mode,
            "extern trainer init"
        );

        let mode: TargetMode = match params.target_mode.parse() {
            Ok(mode) => mode,
            Err(never) => match never {},
        };
        mode.ensure_supported()?;
        let config: BridgeConfig = params.config.parse()?;

        let num_segments = registry.current_count().map(|n| n as u64);
        let pipes = open_pipe_pair(config.c2p_fd, config.p2c_fd)?;
        let bridge = StreamBridge::open(
            pipes.outbound,
            pipes.inbound,
            params.input_dim,
            params.output_dim,
            num_segments,
        )?;

        Ok(Self { bridge })
    }
}

impl<W: Write, R: Read> SprintTrainer<W, R> {
    /// Forward one feed call to the consumer
    pub fn feed(&mut self, request: FeedRequest) -> Result<()> {
        debug!(kind = request.kind(), segment = request.segment_name(), "feed");

        let (features, targets) = match request {
            FeedRequest::Input {
                features,
                target_alignment,
                ..
            } => (features, target_alignment),
            FeedRequest::InputAndTargetAlignment {
                features,
                target_alignment,
                ..
            } => (features, Some(target_alignment)),
            FeedRequest::Unsupervised { features, .. } => (features, None),
            FeedRequest::InputAndTargetSegmentOrth { .. } => {
                return Err(Error::NotImplemented(
                    "orthographic segment targets cannot be streamed".into(),
                ))
            }
        };

        self.bridge.send_data(features, targets)?;
        Ok(())
    }

    /// Finish the stream; calling this twice fails
    pub fn exit(&mut self) -> Result<()> {
        info!("extern trainer exit");
        self.bridge.close()?;
        Ok(())
    }

    /// State of the underlying bridge
    pub fn state(&self) -> BridgeState {
        self.bridge.state()
    }

    /// What has been streamed so far
    pub fn stats(&self) -> StreamStats {
        self.bridge.stats()
    }
}
