//! Client side of the streaming pipeline: capture buffering, chunked
//! transmission, and result delivery.

pub mod assembler;
pub mod queue;
pub mod session;
pub mod sink;

pub use assembler::ChunkAssembler;
pub use queue::OutboundQueue;
pub use session::{SessionConfig, SessionHandle, SessionState, StreamSession};
pub use sink::{CollectorSink, ResultSink, StdoutSink};
