//! Accumulates incoming chunks into transcription segments.

/// Accumulates PCM bytes until the configured window threshold is reached,
/// then releases the whole buffer as one segment.
///
/// Chunk sizes are the client's business; the aggregator only watches total
/// length, so a segment can exceed the threshold by up to one chunk.
/// Residual audio left when the connection ends is discarded by the caller.
pub struct SegmentAggregator {
    buffer: Vec<u8>,
    threshold: usize,
}

impl SegmentAggregator {
    /// Create an aggregator flushing at `threshold` bytes.
    pub fn new(threshold: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(threshold),
            threshold,
        }
    }

    /// Append a chunk; returns the completed segment once the buffered
    /// length reaches the threshold.
    pub fn append(&mut self, chunk: &[u8]) -> Option<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() >= self.threshold {
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }

    /// Bytes buffered below the threshold.
    pub fn residual_len(&self) -> usize {
        self.buffer.len()
    }
}
