//! Audio capture: sample source trait and the cpal-backed implementation.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod source;

pub use source::{MockSampleSource, SampleBlock, SampleSource};
