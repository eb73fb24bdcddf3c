//! Connection lifecycle.
//!
//! ```text
//!  Disconnected ──connect_to_server()──> Connecting ──socket connected──> Connected
//!       ^                                    │                               │
//!       └──────── connect failure ───────────┘                               │
//!       └──────── EOF / read error / disconnect() ───────────────────────────┘
//! ```
//!
//! `Connecting` only exists inside the worker thread; the owner derives it
//! from "a worker is alive but has not flagged the socket as connected yet".

/// Observable state of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No worker is running.
    Disconnected,
    /// A worker is running and its connect attempt has not completed.
    Connecting,
    /// The socket is connected and the read loop is active.
    Connected,
}

impl ConnectionState {
    /// Derives the state from the two facts the owner can observe.
    ///
    /// `connected` wins over `worker_alive` because the worker clears the flag
    /// before it exits, never after.
    pub fn from_flags(worker_alive: bool, connected: bool) -> Self {
        match (worker_alive, connected) {
            (_, true) => ConnectionState::Connected,
            (true, false) => ConnectionState::Connecting,
            (false, false) => ConnectionState::Disconnected,
        }
    }

    /// Returns `true` for [`ConnectionState::Connected`].
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(label)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
