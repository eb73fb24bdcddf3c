//! TOML-based configuration persistence for the client.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\DataSourceTestTool\config.toml`
//! - Linux:    `~/.config/datasource-testtool/config.toml`
//! - macOS:    `~/Library/Application Support/DataSourceTestTool/config.toml`
//!
//! Example file:
//!
//! ```toml
//! [client]
//! log_level = "info"
//! quit_on_server_close = true
//!
//! [network]
//! server_ip = "192.168.10.222"
//! server_port = 22207
//! buffer_size = 1024
//! connect_timeout_ms = 5000
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section, or
//! a file written by an older version all load cleanly.  The default server
//! IP follows the compilation target (see [`ServerPreset::platform_default`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use testtool_core::{
    parse_server_addr, EndpointError, ServerPreset, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_SERVER_PORT, MAX_RECEIVE_BUFFER_SIZE, RECEIVE_BUFFER_SIZE,
};
use thiserror::Error;

use crate::infrastructure::network::ClientConnectionConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `server_ip` / `server_port` do not form a connectable address.
    #[error("invalid server endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),

    /// `buffer_size` is zero or above [`MAX_RECEIVE_BUFFER_SIZE`].
    #[error("buffer_size must be between 1 and {max}, got {0}", max = MAX_RECEIVE_BUFFER_SIZE)]
    InvalidBufferSize(usize),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub network: NetworkSection,
}

/// General client behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Quit the application when the server closes the connection.
    #[serde(default = "default_true")]
    pub quit_on_server_close: bool,
}

/// Where and how to connect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSection {
    /// IP literal of the test tool server.
    #[serde(default = "default_server_ip")]
    pub server_ip: String,
    /// TCP command port of the server.
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Bytes requested per read.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Connect timeout in milliseconds; `0` keeps the OS default.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_server_ip() -> String {
    ServerPreset::platform_default().ip().to_string()
}
fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}
fn default_buffer_size() -> usize {
    RECEIVE_BUFFER_SIZE
}
fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            quit_on_server_close: default_true(),
        }
    }
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            server_ip: default_server_ip(),
            server_port: default_server_port(),
            buffer_size: default_buffer_size(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Validates the `[network]` section into a connection configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpoint`] for an unparsable IP or port 0,
    /// and [`ConfigError::InvalidBufferSize`] for a `buffer_size` of 0 or more
    /// than 1 MiB.
    pub fn connection_config(&self) -> Result<ClientConnectionConfig, ConfigError> {
        let net = &self.network;
        let server_addr = parse_server_addr(&net.server_ip, net.server_port)?;
        if !(1..=MAX_RECEIVE_BUFFER_SIZE).contains(&net.buffer_size) {
            return Err(ConfigError::InvalidBufferSize(net.buffer_size));
        }
        let connect_timeout =
            (net.connect_timeout_ms > 0).then(|| Duration::from_millis(net.connect_timeout_ms));

        Ok(ClientConnectionConfig {
            server_addr,
            buffer_size: net.buffer_size,
            connect_timeout,
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning defaults if the file is absent.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("DataSourceTestTool"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("datasource-testtool"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("DataSourceTestTool")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("testtool_cfg_{}", Uuid::new_v4()))
    }

    #[test]
    fn test_app_config_default_targets_command_port() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.network.server_port, 22207);
        assert_eq!(cfg.network.buffer_size, 1024);
        assert_eq!(cfg.network.connect_timeout_ms, 5000);
    }

    #[test]
    fn test_app_config_default_server_ip_follows_platform() {
        let cfg = AppConfig::default();
        #[cfg(target_os = "windows")]
        assert_eq!(cfg.network.server_ip, "127.0.0.1");
        #[cfg(not(target_os = "windows"))]
        assert_eq!(cfg.network.server_ip, "192.168.10.222");
    }

    #[test]
    fn test_client_section_defaults() {
        let cfg = ClientSection::default();
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.quit_on_server_close);
    }

    #[test]
    fn test_default_connection_config_matches_network_default() {
        // Arrange
        let cfg = AppConfig::default();

        // Act
        let conn = cfg.connection_config().expect("defaults must be valid");

        // Assert
        assert_eq!(conn, ClientConnectionConfig::default());
    }

    #[test]
    fn test_connection_config_maps_timeout_millis() {
        let mut cfg = AppConfig::default();
        cfg.network.connect_timeout_ms = 1500;

        let conn = cfg.connection_config().unwrap();

        assert_eq!(conn.connect_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_connection_config_rejects_bad_ip() {
        let mut cfg = AppConfig::default();
        cfg.network.server_ip = "not-an-ip".to_string();

        let result = cfg.connection_config();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidEndpoint(EndpointError::InvalidIp(_)))
        ));
    }

    #[test]
    fn test_connection_config_rejects_zero_port() {
        let mut cfg = AppConfig::default();
        cfg.network.server_port = 0;
        assert!(matches!(
            cfg.connection_config(),
            Err(ConfigError::InvalidEndpoint(EndpointError::ZeroPort))
        ));
    }

    #[test]
    fn test_connection_config_rejects_zero_buffer() {
        let mut cfg = AppConfig::default();
        cfg.network.buffer_size = 0;
        assert!(matches!(
            cfg.connection_config(),
            Err(ConfigError::InvalidBufferSize(0))
        ));
    }

    #[test]
    fn test_connection_config_rejects_oversized_buffer() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.network.buffer_size = usize::MAX;

        // Act
        let result = cfg.connection_config();

        // Assert
        assert!(matches!(
            result,
            Err(ConfigError::InvalidBufferSize(size)) if size == usize::MAX
        ));
    }

    #[test]
    fn test_connection_config_accepts_largest_buffer() {
        let mut cfg = AppConfig::default();
        cfg.network.buffer_size = MAX_RECEIVE_BUFFER_SIZE;

        let conn = cfg.connection_config().unwrap();

        assert_eq!(conn.buffer_size, MAX_RECEIVE_BUFFER_SIZE);
    }

    #[test]
    fn test_connection_config_zero_timeout_keeps_os_default() {
        let mut cfg = AppConfig::default();
        cfg.network.connect_timeout_ms = 0;

        let conn = cfg.connection_config().unwrap();

        assert_eq!(conn.connect_timeout, None);
    }

    // ── TOML parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("empty file is valid");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_deserialize_partial_network_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[network]
server_ip = "127.0.0.1"
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.network.server_ip, "127.0.0.1");
        // Unspecified fields keep their defaults
        assert_eq!(cfg.network.server_port, 22207);
        assert_eq!(cfg.client.log_level, "info");
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result: Result<AppConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    // ── File round trips ──────────────────────────────────────────────────────

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = scratch_dir().join("config.toml");
        let cfg = load_config_from(&path).expect("missing file is not an error");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_then_load_config_round_trip() {
        // Arrange
        let dir = scratch_dir();
        let path = dir.join("nested").join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.network.server_ip = "10.1.2.3".to_string();
        cfg.network.server_port = 30000;
        cfg.client.quit_on_server_close = false;

        // Act
        save_config_to(&cfg, &path).expect("save");
        let loaded = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_from_malformed_file_returns_parse_error() {
        // Arrange
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[network\nserver_port = ").unwrap();

        // Act
        let result = load_config_from(&path);

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
        // NoPlatformConfigDir in a stripped CI env is also acceptable.
    }
}
