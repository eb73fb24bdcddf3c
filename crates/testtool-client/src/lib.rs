//! testtool-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the client do? (for beginners)
//!
//! The test tool *server* runs on a desktop machine and streams text to the
//! HMI under test.  The *client* runs next to the HMI:
//!
//! 1. Opens one TCP connection to the server's command port (22207).
//! 2. Reads whatever bytes arrive on a background worker thread.
//! 3. Prints each chunk as text on standard output.
//!
//! There is no retry: if the connection fails or the server hangs up, the
//! worker exits and `is_connected()` reports `false` from then on.

/// Application layer: lifecycle hooks driven by the host application.
pub mod application;

/// Infrastructure layer: network worker, output sink, and config storage.
pub mod infrastructure;
