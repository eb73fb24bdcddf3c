//! Output adapters for received text.
//!
//! The network worker does not print directly; it hands every decoded chunk
//! to a [`MessageSink`].  Production code uses [`StdoutSink`], tests inject
//! [`mock::RecordingSink`] to observe exactly what was delivered.

use std::io::Write;

pub mod mock;

/// Destination for text received from the server.
///
/// Called on the worker thread, once per successful non-empty read.
pub trait MessageSink: Send + Sync {
    /// Handles one received chunk.
    fn deliver(&self, text: &str);
}

/// Prints each chunk to standard output as `Received: <text>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl StdoutSink {
    /// Formats a chunk the way it appears on the console.
    pub fn format_line(text: &str) -> String {
        format!("Received: {text}")
    }
}

impl MessageSink for StdoutSink {
    fn deliver(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not take the worker down.
        let _ = writeln!(out, "{}", Self::format_line(text));
        let _ = out.flush();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
