//! Default configuration constants for dolmetsch.
//!
//! Shared across client and server so that both sides agree on the wire
//! format without negotiation.

use std::time::Duration;

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and what the transcription
/// engine expects for its input segments.
pub const SAMPLE_RATE: u32 = 16_000;

/// Bytes per sample on the wire (16-bit signed little-endian PCM).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Duration of one transmitted chunk in seconds.
///
/// The client assembles capture buffers into chunks of exactly this length
/// and sends each chunk as one binary WebSocket message.
pub const CHUNK_SECONDS: u32 = 1;

/// Duration of one transcription window in seconds.
///
/// The server accumulates inbound chunks until it holds this much audio,
/// then hands the whole buffer to the transcription engine as one segment.
pub const WINDOW_SECONDS: u32 = 5;

/// Capacity of the client's outbound chunk queue.
///
/// At one chunk per second this is roughly a minute of backlog. When the
/// queue is full the oldest chunk is dropped, so a stalled network costs
/// the oldest audio rather than blocking the capture path.
pub const QUEUE_CAPACITY: usize = 64;

/// Samples per capture block handed from the audio callback to the pipeline.
///
/// 1600 samples is 100ms at 16kHz — small enough to keep the capture
/// callback cheap, large enough to keep channel traffic low.
pub const BLOCK_SAMPLES: usize = 1600;

/// Bounded wait used by all cooperative loops.
///
/// A stop request is observed within one poll interval rather than at the
/// next network or audio event.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Result text sent when a segment transcribes to nothing.
pub const NO_SPEECH_TEXT: &str = "No speech detected.";

/// Default port the streaming server listens on.
pub const SERVER_PORT: u16 = 42331;

/// Default target language for translation.
pub const TARGET_LANGUAGE: &str = "EN-GB";

/// Default path to the transcription model file.
pub const MODEL_PATH: &str = "models/ggml-base.bin";

/// Source language value meaning "let the model detect it".
pub const AUTO_LANGUAGE: &str = "auto";

/// Size of one chunk in bytes for the given sample rate.
pub const fn chunk_size(sample_rate: u32) -> usize {
    sample_rate as usize * BYTES_PER_SAMPLE * CHUNK_SECONDS as usize
}

/// Segment flush threshold in bytes for the given sample rate and window.
pub const fn window_size(sample_rate: u32, window_seconds: u32) -> usize {
    sample_rate as usize * BYTES_PER_SAMPLE * window_seconds as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_matches_one_second_of_pcm() {
        // 16000 samples/s * 2 bytes * 1s
        assert_eq!(chunk_size(SAMPLE_RATE), 32_000);
    }

    #[test]
    fn window_size_matches_five_seconds_of_pcm() {
        // 16000 samples/s * 2 bytes * 5s
        assert_eq!(window_size(SAMPLE_RATE, WINDOW_SECONDS), 160_000);
    }

    #[test]
    fn chunk_is_a_whole_number_of_capture_blocks() {
        assert_eq!(
            chunk_size(SAMPLE_RATE) % (BLOCK_SAMPLES * BYTES_PER_SAMPLE),
            0
        );
    }
}
