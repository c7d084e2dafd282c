//! Segment processing: transcription followed by translation.

use crate::defaults;
use crate::engine::{Transcriber, Translator};
use crate::error::Result;
use crate::protocol::ResultMessage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Turns one audio segment into exactly one [`ResultMessage`].
///
/// Engines are shared across sessions behind `Arc`; calls are synchronous
/// and must run on a blocking context. Engine failures become result data
/// rather than faults, so a bad segment never tears a session down.
pub struct SegmentPipeline {
    transcriber: Arc<dyn Transcriber>,
    translator: Arc<dyn Translator>,
}

impl SegmentPipeline {
    pub fn new(transcriber: Arc<dyn Transcriber>, translator: Arc<dyn Translator>) -> Self {
        Self {
            transcriber,
            translator,
        }
    }

    /// Name of the loaded transcription model.
    pub fn model_name(&self) -> &str {
        self.transcriber.model_name()
    }

    /// Process one segment of raw 16-bit LE PCM bytes.
    ///
    /// Always produces a message: translated text, the no-speech sentinel
    /// for empty transcriptions, or an error description.
    pub fn process(&self, segment: &[u8]) -> ResultMessage {
        let samples = samples_from_le_bytes(segment);
        let started = Instant::now();

        match self.process_samples(&samples) {
            Ok(text) => {
                debug!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    chars = text.len(),
                    "segment processed"
                );
                ResultMessage::new(text)
            }
            Err(e) => {
                warn!(error = %e, "segment processing failed");
                ResultMessage::new(format!("Error: {}", e))
            }
        }
    }

    /// Transcribe and translate one batch of samples.
    ///
    /// Shared by the stream and batch paths: an empty transcription becomes
    /// the sentinel without touching the translator, everything else goes
    /// through it. Engine errors propagate to the caller.
    pub fn process_samples(&self, samples: &[i16]) -> Result<String> {
        let Some(text) = self.transcribe(samples)? else {
            return Ok(defaults::NO_SPEECH_TEXT.to_string());
        };
        self.translator.translate(&text)
    }

    /// Transcribe samples; `None` when nothing was recognized.
    ///
    /// The no-speech case is the emptiness of the transcript, never its
    /// content, so a genuine utterance of the sentinel text still counts as
    /// speech.
    pub fn transcribe(&self, samples: &[i16]) -> Result<Option<String>> {
        let text = self.transcriber.transcribe(samples)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }
}

/// Reinterpret raw bytes as 16-bit LE samples. A trailing odd byte is
/// dropped.
pub fn samples_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
