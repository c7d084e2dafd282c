//! Accumulates capture blocks into fixed-size wire chunks.

use crate::audio::source::SampleBlock;

/// Accumulates PCM bytes and emits chunks of exactly `chunk_size` bytes.
///
/// Residual bytes below one chunk length stay buffered, so chunk boundaries
/// are independent of the capture block size. Residue at session teardown is
/// discarded — a partial chunk never crosses the wire.
pub struct ChunkAssembler {
    buffer: Vec<u8>,
    chunk_size: usize,
}

impl ChunkAssembler {
    /// Create an assembler producing chunks of `chunk_size` bytes.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(chunk_size * 2),
            chunk_size,
        }
    }

    /// Append a capture block, returning any chunks it completed.
    ///
    /// Zero, one, or several chunks may complete per block; each returned
    /// chunk is exactly `chunk_size` bytes and chunks come out in capture
    /// order.
    pub fn append(&mut self, block: &SampleBlock) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(&block.to_le_bytes());

        let mut chunks = Vec::new();
        while self.buffer.len() >= self.chunk_size {
            let rest = self.buffer.split_off(self.chunk_size);
            chunks.push(std::mem::replace(&mut self.buffer, rest));
        }
        chunks
    }

    /// Bytes currently buffered below one chunk.
    pub fn residual_len(&self) -> usize {
        self.buffer.len()
    }
}
