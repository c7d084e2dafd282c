//! Engine trait seams for transcription and translation.
//!
//! Both engines are opaque synchronous collaborators: the server calls them
//! from blocking worker contexts and treats any failure as data, not as a
//! session fault.

pub mod transcriber;
pub mod translator;
pub mod whisper;

pub use transcriber::{MockTranscriber, Transcriber};
pub use translator::{HttpTranslator, MockTranslator, PassthroughTranslator, Translator};
pub use whisper::{WhisperSettings, WhisperTranscriber};
