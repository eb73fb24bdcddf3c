//! # testtool-core
//!
//! Shared library for the DataSource Test Tool client containing the server
//! endpoint presets, the connection state machine, and the text helpers used
//! on received data.
//!
//! It has zero dependencies on OS APIs, UI frameworks, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! The test tool is a pair of programs: a desktop *server* that pushes data
//! values to a running HMI, and a small *client* embedded next to the HMI that
//! connects to the server over TCP and prints whatever text arrives.
//!
//! This crate (`testtool-core`) is the pure foundation of the client:
//!
//! - **`domain`** – Where the server lives (`ServerPreset`, port 22207) and
//!   which state a connection is in (`ConnectionState`).
//!
//! - **`text`** – `split` / `join` helpers for delimiter-separated text.  The
//!   pair is lossless: joining a split string with the same delimiter gives the
//!   original string back.

pub mod domain;
pub mod text;

pub use domain::connection::ConnectionState;
pub use domain::endpoint::{
    parse_server_addr, EndpointError, ServerPreset, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_SERVER_PORT, MAX_RECEIVE_BUFFER_SIZE, RECEIVE_BUFFER_SIZE,
};
pub use text::{join, split};
