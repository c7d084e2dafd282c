//! Result delivery seam.

use std::sync::Mutex;

/// Receives translated caption text as it arrives from the server.
///
/// Delivery happens on the session's receive task; implementations should
/// return quickly.
pub trait ResultSink: Send + Sync {
    fn deliver(&self, text: &str);
}

/// Prints each caption on its own line.
pub struct StdoutSink;

impl ResultSink for StdoutSink {
    fn deliver(&self, text: &str) {
        println!("{}", text);
    }
}

/// Collects captions in memory for test assertions.
#[derive(Default)]
pub struct CollectorSink {
    texts: Mutex<Vec<String>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captions received so far, in delivery order.
    pub fn texts(&self) -> Vec<String> {
        match self.texts.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ResultSink for CollectorSink {
    fn deliver(&self, text: &str) {
        if let Ok(mut texts) = self.texts.lock() {
            texts.push(text.to_string());
        }
    }
}
