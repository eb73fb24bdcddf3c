//! Recording sink for tests.
//!
//! # Usage in tests
//!
//! ```ignore
//! let sink = Arc::new(RecordingSink::new());
//! let client = NetworkClient::new(config, sink.clone());
//! client.connect_to_server();
//! // ... server writes "hello" ...
//! assert_eq!(sink.joined(), "hello");
//! ```

use std::sync::Mutex;

use super::MessageSink;

/// A sink that stores every delivered chunk in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Each chunk passed to `deliver`, in arrival order.
    pub chunks: Mutex<Vec<String>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the recorded chunks.
    pub fn chunks(&self) -> Vec<String> {
        self.chunks.lock().unwrap().clone()
    }

    /// All recorded chunks concatenated.
    ///
    /// TCP may split or merge writes, so tests compare the concatenation
    /// rather than individual chunks.
    pub fn joined(&self) -> String {
        self.chunks.lock().unwrap().concat()
    }
}

impl MessageSink for RecordingSink {
    fn deliver(&self, text: &str) {
        self.chunks.lock().unwrap().push(text.to_string());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
