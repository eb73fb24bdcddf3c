//! Server endpoint presets.
//!
//! The test tool server listens on a single TCP command port.  Historically
//! the client picked the server IP at compile time: loopback on Windows
//! (server and HMI on the same desk machine) and a fixed LAN address on the
//! Linux target board.  Both addresses are kept here as named presets so the
//! default behaviour is unchanged, while the actual address used at runtime is
//! an explicit configuration value.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;

/// TCP port of the server's command channel.
pub const DEFAULT_SERVER_PORT: u16 = 22207;

/// Size in bytes of the buffer each read fills.
pub const RECEIVE_BUFFER_SIZE: usize = 1024;

/// Largest receive buffer a client will allocate (1 MiB).
pub const MAX_RECEIVE_BUFFER_SIZE: usize = 1024 * 1024;

/// Default bound on a connect attempt, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Errors produced while building a server address from configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    /// The IP string is not a valid IPv4 or IPv6 literal.
    #[error("invalid server IP address {0:?}")]
    InvalidIp(String),
    /// Port 0 cannot be connected to.
    #[error("server port must be non-zero")]
    ZeroPort,
}

/// Named server locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerPreset {
    /// Server on the same machine (`127.0.0.1`).
    Windows,
    /// Server on the bench network (`192.168.10.222`).
    Linux,
}

impl ServerPreset {
    /// Preset matching the compilation target.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "windows") {
            ServerPreset::Windows
        } else {
            ServerPreset::Linux
        }
    }

    /// IP address of the server for this preset.
    pub fn ip(self) -> IpAddr {
        match self {
            ServerPreset::Windows => IpAddr::V4(Ipv4Addr::LOCALHOST),
            ServerPreset::Linux => IpAddr::V4(Ipv4Addr::new(192, 168, 10, 222)),
        }
    }

    /// Full command-channel address (`ip:22207`).
    pub fn socket_addr(self) -> SocketAddr {
        SocketAddr::new(self.ip(), DEFAULT_SERVER_PORT)
    }
}

/// Builds a server address from a textual IP and a port.
///
/// Surrounding whitespace in `ip` is ignored.
///
/// # Errors
///
/// Returns [`EndpointError::InvalidIp`] when `ip` does not parse and
/// [`EndpointError::ZeroPort`] when `port` is 0.
pub fn parse_server_addr(ip: &str, port: u16) -> Result<SocketAddr, EndpointError> {
    let ip: IpAddr = ip
        .trim()
        .parse()
        .map_err(|_| EndpointError::InvalidIp(ip.to_string()))?;
    if port == 0 {
        return Err(EndpointError::ZeroPort);
    }
    Ok(SocketAddr::new(ip, port))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
