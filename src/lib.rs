//! dolmetsch - live speech translation streaming
//!
//! Captures microphone audio, streams it to a transcription server over a
//! duplex WebSocket, and prints translated captions as segments complete.
//! The same binary runs either side.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod app;
pub mod audio;
pub mod cli;
pub mod client;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod server;

// Core traits (source → transport → engines → sink)
pub use audio::source::{SampleBlock, SampleSource};
pub use client::sink::{CollectorSink, ResultSink, StdoutSink};
pub use engine::{Transcriber, Translator};

// Client session
pub use client::session::{SessionConfig, SessionHandle, SessionState, StreamSession};

// Server surface
pub use server::{router, AppState, SegmentPipeline};

// Error handling
pub use error::{DolmetschError, Result};

// Config
pub use config::Config;

// Wire protocol
pub use protocol::ResultMessage;
