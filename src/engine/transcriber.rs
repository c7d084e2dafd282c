//! Transcription engine seam.

use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (a real model server vs mock).
/// Calls are synchronous and potentially slow — proportional to the segment
/// length — so callers must not invoke them on a latency-sensitive path.
pub trait Transcriber: Send + Sync {
    /// Transcribe audio samples to text.
    ///
    /// # Arguments
    /// * `audio` - Audio samples as 16-bit PCM at 16kHz mono
    ///
    /// # Returns
    /// Transcribed text, possibly empty when no speech was recognized.
    fn transcribe(&self, audio: &[i16]) -> Result<String>;

    /// Name of the loaded model, for logging.
    fn model_name(&self) -> &str;
}

/// Implement Transcriber for Arc<T> to allow sharing across sessions.
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    fn transcribe(&self, audio: &[i16]) -> Result<String> {
        (**self).transcribe(audio)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Mock transcriber for testing.
///
/// Records the samples each call received so tests can assert on both the
/// segment sizes and the exact content the aggregator hands over.
pub struct MockTranscriber {
    model_name: String,
    response: String,
    should_fail: bool,
    calls: AtomicUsize,
    call_audio: Mutex<Vec<Vec<i16>>>,
}

impl MockTranscriber {
    /// Create a new mock transcriber returning empty text.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: String::new(),
            should_fail: false,
            calls: AtomicUsize::new(0),
            call_audio: Mutex::new(Vec::new()),
        }
    }

    /// Configure the mock to return a specific response.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on every call.
    pub fn failing(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of transcribe calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Sample counts of each call, in call order.
    pub fn call_sizes(&self) -> Vec<usize> {
        self.call_audio
            .lock()
            .map(|v| v.iter().map(Vec::len).collect())
            .unwrap_or_default()
    }

    /// Samples of each call, in call order.
    pub fn call_audio(&self) -> Vec<Vec<i16>> {
        self.call_audio.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, audio: &[i16]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.call_audio.lock() {
            calls.push(audio.to_vec());
        }
        if self.should_fail {
            return Err(crate::error::DolmetschError::Transcription {
                message: "mock failure".to_string(),
            });
        }
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
