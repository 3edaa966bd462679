//! Feed calls a trainer host can make

use sprint_bridge_core::DenseTensor;

/// One feed call from the trainer host
///
/// Weights and segment names are accepted for every variant but not sent;
/// the consumer only receives features and targets.
#[derive(Debug, Clone)]
pub enum FeedRequest {
    /// Features with an optional target alignment
    Input {
        /// Feature matrix `[input_dim, frames]`
        features: DenseTensor,
        /// Per-frame target indices
        target_alignment: Option<DenseTensor>,
        /// Per-frame weights
        weights: Option<DenseTensor>,
        /// Corpus name of the segment
        segment_name: Option<String>,
    },
    /// Features with a required target alignment
    InputAndTargetAlignment {
        /// Feature matrix `[input_dim, frames]`
        features: DenseTensor,
        /// Per-frame target indices
        target_alignment: DenseTensor,
        /// Per-frame weights
        weights: Option<DenseTensor>,
        /// Corpus name of the segment
        segment_name: Option<String>,
    },
    /// Features with the orthography of the segment; not supported
    InputAndTargetSegmentOrth {
        /// Feature matrix `[input_dim, frames]`
        features: DenseTensor,
        /// Orthographic transcription
        target_segment_orth: String,
        /// Per-frame weights
        weights: Option<DenseTensor>,
        /// Corpus name of the segment
        segment_name: Option<String>,
    },
    /// Features without targets
    Unsupervised {
        /// Feature matrix `[input_dim, frames]`
        features: DenseTensor,
        /// Per-frame weights
        weights: Option<DenseTensor>,
        /// Corpus name of the segment
        segment_name: Option<String>,
    },
}

impl FeedRequest {
    /// Name of the feed call, as Sprint knows it
    pub fn kind(&self) -> &'static str {
        match self {
            FeedRequest::Input { .. } => "feedInput",
            FeedRequest::InputAndTargetAlignment { .. } => "feedInputAndTargetAlignment",
            FeedRequest::InputAndTargetSegmentOrth { .. } => "feedInputAndTargetSegmentOrth",
            FeedRequest::Unsupervised { .. } => "feedInputUnsupervised",
        }
    }

    /// Segment name attached to the call, if any
    pub fn segment_name(&self) -> Option<&str> {
        match self {
            FeedRequest::Input { segment_name, .. }
            | FeedRequest::InputAndTargetAlignment { segment_name, .. }
            | FeedRequest::InputAndTargetSegmentOrth { segment_name, .. }
            | FeedRequest::Unsupervised { segment_name, .. } => segment_name.as_deref(),
        }
    }

    /// Features with a target alignment and nothing else
    pub fn aligned(features: DenseTensor, target_alignment: DenseTensor) -> Self {
        FeedRequest::InputAndTargetAlignment {
            features,
            target_alignment,
            weights: None,
            segment_name: None,
        }
    }

    /// Features without targets and nothing else
    pub fn unsupervised(features: DenseTensor) -> Self {
        FeedRequest::Unsupervised {
            features,
            weights: None,
            segment_name: None,
        }
    }
}
