use crate::defaults;
use crate::error::{DolmetschError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub stream: StreamConfig,
    pub server: ServerConfig,
    pub translation: TranslationConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
}

/// Client streaming configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    /// Transcription endpoint as `host:port`; scheme prefixes are stripped.
    pub endpoint: String,
    /// Seconds of audio per transmitted chunk.
    pub chunk_seconds: u32,
    /// Outbound queue capacity in chunks; oldest chunks are dropped on overflow.
    pub queue_capacity: usize,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds of audio accumulated before a segment is transcribed.
    pub window_seconds: u32,
    /// Path to the transcription model file.
    pub model_path: PathBuf,
    /// Source language code, or "auto" for detection.
    pub language: String,
}

/// Translation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationConfig {
    /// Remote translation API base URL; empty disables remote translation.
    pub api_url: String,
    pub api_key: Option<String>,
    pub target_lang: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: format!("127.0.0.1:{}", defaults::SERVER_PORT),
            chunk_seconds: defaults::CHUNK_SECONDS,
            queue_capacity: defaults::QUEUE_CAPACITY,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: defaults::SERVER_PORT,
            window_seconds: defaults::WINDOW_SECONDS,
            model_path: PathBuf::from(defaults::MODEL_PATH),
            language: defaults::AUTO_LANGUAGE.to_string(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: None,
            target_lang: defaults::TARGET_LANGUAGE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if the file doesn't
    /// exist. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - TRANSCRIPTION_ENDPOINT → stream.endpoint
    /// - DOLMETSCH_DEVICE → audio.device
    /// - DOLMETSCH_TARGET_LANG → translation.target_lang
    /// - TRANSLATION_API_KEY → translation.api_key
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("TRANSCRIPTION_ENDPOINT") {
            if !endpoint.is_empty() {
                self.stream.endpoint = endpoint;
            }
        }
        if let Ok(device) = std::env::var("DOLMETSCH_DEVICE") {
            if !device.is_empty() {
                self.audio.device = Some(device);
            }
        }
        if let Ok(lang) = std::env::var("DOLMETSCH_TARGET_LANG") {
            if !lang.is_empty() {
                self.translation.target_lang = lang;
            }
        }
        if let Ok(key) = std::env::var("TRANSLATION_API_KEY") {
            if !key.is_empty() {
                self.translation.api_key = Some(key);
            }
        }
        self
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(DolmetschError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.stream.chunk_seconds == 0 {
            return Err(DolmetschError::ConfigInvalidValue {
                key: "stream.chunk_seconds".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.stream.queue_capacity == 0 {
            return Err(DolmetschError::ConfigInvalidValue {
                key: "stream.queue_capacity".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.server.window_seconds == 0 {
            return Err(DolmetschError::ConfigInvalidValue {
                key: "server.window_seconds".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Chunk size in bytes derived from the audio and stream settings.
    pub fn chunk_size(&self) -> usize {
        self.audio.sample_rate as usize
            * defaults::BYTES_PER_SAMPLE
            * self.stream.chunk_seconds as usize
    }

    /// Segment flush threshold in bytes derived from the server settings.
    pub fn window_size(&self) -> usize {
        self.audio.sample_rate as usize
            * defaults::BYTES_PER_SAMPLE
            * self.server.window_seconds as usize
    }
}
