//! Sample source abstraction for audio capture.
//!
//! A source delivers fixed-size blocks of 16-bit mono PCM over a bounded
//! channel. The capture side runs on the audio subsystem's own thread and
//! must never block, so delivery uses `try_send`; a full channel drops the
//! block and flags an overrun on the next one (logged downstream, not fatal).

use crate::defaults;
use crate::error::Result;
use crossbeam_channel::Receiver;

/// One block of captured audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBlock {
    /// PCM samples (16-bit signed integers, mono).
    pub samples: Vec<i16>,
    /// Device or channel reported dropped input since the previous block.
    pub overrun: bool,
}

impl SampleBlock {
    /// Creates a new block without an overrun flag.
    pub fn new(samples: Vec<i16>) -> Self {
        Self {
            samples,
            overrun: false,
        }
    }

    /// Serializes the samples as little-endian bytes, the wire layout.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * defaults::BYTES_PER_SAMPLE);
        for sample in &self.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }
}

/// Trait for audio capture sources.
///
/// This trait allows swapping implementations (real cpal device vs mock).
pub trait SampleSource: Send {
    /// Begin capture. Blocks arrive on the returned channel until `stop`
    /// is called or, for finite sources, until the input is exhausted
    /// (signalled by channel disconnect).
    fn start(&mut self) -> Result<Receiver<SampleBlock>>;

    /// Stop capture and release the device.
    ///
    /// Idempotent: stopping a source that is not running is a no-op.
    fn stop(&mut self) -> Result<()>;
}

/// Mock sample source for testing.
///
/// Delivers a pre-scripted sequence of blocks and then disconnects,
/// which lets tests drive the pipeline without audio hardware.
pub struct MockSampleSource {
    blocks: Vec<SampleBlock>,
    started: bool,
}

impl MockSampleSource {
    /// Creates a source that will deliver the given blocks in order.
    pub fn new(blocks: Vec<SampleBlock>) -> Self {
        Self {
            blocks,
            started: false,
        }
    }

    /// Creates a source delivering `seconds` of silence split into
    /// `defaults::BLOCK_SAMPLES`-sized blocks at the given sample rate.
    pub fn silence(seconds: u32, sample_rate: u32) -> Self {
        let total = (seconds * sample_rate) as usize;
        let blocks = (0..total / defaults::BLOCK_SAMPLES)
            .map(|_| SampleBlock::new(vec![0i16; defaults::BLOCK_SAMPLES]))
            .collect();
        Self::new(blocks)
    }
}

impl SampleSource for MockSampleSource {
    fn start(&mut self) -> Result<Receiver<SampleBlock>> {
        let blocks = std::mem::take(&mut self.blocks);
        self.started = true;

        // Unbounded so the scripted feed never stalls the test thread;
        // the real source uses a bounded channel with drop-on-full.
        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::spawn(move || {
            for block in blocks {
                if tx.send(block).is_err() {
                    break;
                }
            }
            // Sender drops here: receiver observes disconnect = end of input.
        });
        Ok(rx)
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }
}
