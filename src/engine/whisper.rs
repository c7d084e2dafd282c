//! Whisper-based transcription engine.
//!
//! Requires the `whisper` feature (and cmake at build time). Without it
//! this module compiles to a stub whose constructor still validates the
//! model path but whose `transcribe` always fails, so the rest of the
//! server can be built and tested on machines without the native
//! toolchain.

use crate::defaults;
use crate::engine::transcriber::Transcriber;
use crate::error::{DolmetschError, Result};
use std::path::{Path, PathBuf};

#[cfg(feature = "whisper")]
use std::sync::Mutex;
#[cfg(feature = "whisper")]
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Settings for the whisper engine.
#[derive(Debug, Clone)]
pub struct WhisperSettings {
    /// Path to the ggml model file.
    pub model_path: PathBuf,
    /// Source language code, or "auto" for detection.
    pub language: String,
}

impl Default for WhisperSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::MODEL_PATH),
            language: defaults::AUTO_LANGUAGE.to_string(),
        }
    }
}

fn model_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Transcriber backed by whisper.cpp.
///
/// The context is behind a mutex: whisper states are cheap, the context is
/// not, and concurrent sessions share one loaded model.
#[cfg(feature = "whisper")]
pub struct WhisperTranscriber {
    context: Mutex<WhisperContext>,
    settings: WhisperSettings,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl WhisperTranscriber {
    /// Load the model named in `settings`.
    pub fn new(settings: WhisperSettings) -> Result<Self> {
        if !settings.model_path.exists() {
            return Err(DolmetschError::Transcription {
                message: format!(
                    "model file not found: {}",
                    settings.model_path.display()
                ),
            });
        }
        let model_name = model_name_from_path(&settings.model_path);

        let path = settings
            .model_path
            .to_str()
            .ok_or_else(|| DolmetschError::Transcription {
                message: "invalid UTF-8 in model path".to_string(),
            })?;
        let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| DolmetschError::Transcription {
                message: format!("failed to load model: {}", e),
            })?;

        Ok(Self {
            context: Mutex::new(context),
            settings,
            model_name,
        })
    }
}

#[cfg(feature = "whisper")]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio: &[i16]) -> Result<String> {
        // Whisper wants f32 in [-1.0, 1.0].
        let audio_f32: Vec<f32> = audio.iter().map(|&s| s as f32 / 32768.0).collect();

        let context = self
            .context
            .lock()
            .map_err(|e| DolmetschError::Transcription {
                message: format!("context lock poisoned: {}", e),
            })?;
        let mut state = context
            .create_state()
            .map_err(|e| DolmetschError::Transcription {
                message: format!("failed to create state: {}", e),
            })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        if self.settings.language == defaults::AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.settings.language));
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &audio_f32)
            .map_err(|e| DolmetschError::Transcription {
                message: format!("inference failed: {}", e),
            })?;

        let segments = state
            .full_n_segments()
            .map_err(|e| DolmetschError::Transcription {
                message: format!("failed to read segments: {}", e),
            })?;
        let mut text = String::new();
        for i in 0..segments {
            let segment =
                state
                    .full_get_segment_text(i)
                    .map_err(|e| DolmetschError::Transcription {
                        message: format!("failed to read segment text: {}", e),
                    })?;
            text.push_str(&segment);
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Stub used when the crate is built without the `whisper` feature.
#[cfg(not(feature = "whisper"))]
pub struct WhisperTranscriber {
    model_name: String,
}

#[cfg(not(feature = "whisper"))]
impl WhisperTranscriber {
    pub fn new(settings: WhisperSettings) -> Result<Self> {
        if !settings.model_path.exists() {
            return Err(DolmetschError::Transcription {
                message: format!(
                    "model file not found: {}",
                    settings.model_path.display()
                ),
            });
        }
        Ok(Self {
            model_name: model_name_from_path(&settings.model_path),
        })
    }
}

#[cfg(not(feature = "whisper"))]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, _audio: &[i16]) -> Result<String> {
        Err(DolmetschError::Transcription {
            message: "built without whisper support, rebuild with --features whisper".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
