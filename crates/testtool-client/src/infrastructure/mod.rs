//! Infrastructure layer for the client application.
//!
//! Contains OS-facing adapters: TCP socket I/O, standard output, and the
//! configuration file.
//!
//! **Dependency rule**: this layer may depend on `testtool_core`, but MUST NOT
//! be imported by the `testtool_core` domain.
//!
//! # Sub-modules
//!
//! - **`network`** – `NetworkClient`: owns the worker thread that connects to
//!   the server, reads raw bytes, and hands them to a `MessageSink`.
//!
//! - **`output`** – Where received text goes.  `StdoutSink` prints it; the
//!   `mock` sub-module records it for tests.
//!
//! - **`storage`** – TOML configuration persistence.

pub mod network;
pub mod output;
pub mod storage;
