//! Segment order cache used to size the handshake

use tracing::info;

/// Last segment order reported by the segment order provider
///
/// The registry only exists to estimate how many segments will be streamed.
/// It does no shuffling or filtering; later records replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct SegmentOrderRegistry {
    /// Segment names from the most recent record, if any
    segments: Option<Vec<String>>,
}

impl SegmentOrderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the segment order for `corpus_name` and hand the same order back
    pub fn record_segments(&mut self, corpus_name: &str, segments: Vec<String>) -> &[String] {
        info!(corpus = corpus_name, num_segments = segments.len(), "segment order recorded");
        self.segments.insert(segments)
    }

    /// Number of segments in the last record, `None` if nothing was recorded
    pub fn current_count(&self) -> Option<usize> {
        self.segments.as_ref().map(Vec::len)
    }

    /// Segment names from the last record
    pub fn segments(&self) -> Option<&[String]> {
        self.segments.as_deref()
    }
}
