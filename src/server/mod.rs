//! Server side: segment aggregation, the transcription/translation
//! pipeline, and the HTTP/WebSocket surface.

pub mod aggregator;
pub mod http;
pub mod pipeline;
pub mod stream;

pub use aggregator::SegmentAggregator;
pub use http::{router, serve, AppState};
pub use pipeline::SegmentPipeline;
