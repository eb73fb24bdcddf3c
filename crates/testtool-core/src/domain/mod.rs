//! Domain entities for the test tool client.
//!
//! Pure types with no infrastructure dependencies: they compile and test on
//! any platform without sockets or a running server.

/// Connection lifecycle as observed by the owner of a client.
pub mod connection;

/// Server endpoint presets and address validation.
pub mod endpoint;
