//! DataSource Test Tool client entry point.
//!
//! Stands in for the HMI host: it drives the lifecycle hooks, feeds console
//! lines in as key presses, and pumps network events until a quit is
//! requested or Ctrl-C arrives.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_or_create_config()            -- TOML file or defaults
//!  └─ TestToolApplication::new()         -- owns the NetworkClient
//!       ├─ on_configure / register_metadata_override
//!       └─ on_project_loaded             -- spawns the network worker
//!  └─ select loop
//!       ├─ Ctrl-C                        -> quit
//!       ├─ stdin line ("q", "esc", ...)  -> on_key_input_event
//!       └─ 100 ms tick                   -> pump_events
//!  └─ shutdown()                         -- joins the worker (blocking task)
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use testtool_client::application::lifecycle::{
    ApplicationProperties, InputKey, TestToolApplication,
};
use testtool_client::infrastructure::network::{ClientConnectionConfig, NetworkClient};
use testtool_client::infrastructure::output::StdoutSink;
use testtool_client::infrastructure::storage::config::{self, AppConfig};

const EVENT_PUMP_INTERVAL: Duration = Duration::from_millis(100);

/// Loads the config file, writing a default one on first run.
fn load_or_create_config() -> AppConfig {
    let path = match config::config_file_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{e}; using built-in defaults");
            return AppConfig::default();
        }
    };

    let first_run = !path.exists();
    match config::load_config_from(&path) {
        Ok(cfg) => {
            if first_run {
                if let Err(e) = config::save_config_to(&cfg, &path) {
                    eprintln!("could not write default config: {e}");
                }
            }
            cfg
        }
        Err(e) => {
            eprintln!("{e}; using built-in defaults");
            AppConfig::default()
        }
    }
}

/// Forwards console lines from a dedicated thread.
///
/// A plain thread rather than `tokio::io::stdin`, whose blocking read would
/// hold up runtime shutdown until the next Enter key.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("testtool-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!("console input disabled: {e}");
    }
    rx
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = load_or_create_config();

    // Initialise structured logging.  `RUST_LOG` overrides the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&app_config.client.log_level)),
        )
        .init();

    info!("DataSource Test Tool client starting");

    let connection = match app_config.connection_config() {
        Ok(connection) => connection,
        Err(e) => {
            error!("invalid network configuration ({e}); falling back to defaults");
            ClientConnectionConfig::default()
        }
    };

    let client = NetworkClient::new(connection, Arc::new(StdoutSink));
    let mut app = TestToolApplication::new(client, app_config.client.quit_on_server_close);

    // ── Lifecycle ─────────────────────────────────────────────────────────────
    let mut properties = ApplicationProperties::default();
    app.on_configure(&mut properties);
    app.register_metadata_override();
    app.on_project_loaded();

    // ── Main loop ─────────────────────────────────────────────────────────────
    let mut console = spawn_stdin_reader();
    let mut stdin_open = true;
    let mut ticker = tokio::time::interval(EVENT_PUMP_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while !app.is_quit_requested() {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    warn!("failed to listen for Ctrl-C: {e}");
                }
                info!("shutdown signal received");
                app.quit();
            }
            line = console.recv(), if stdin_open => match line {
                Some(line) => {
                    if let Some(key) = InputKey::from_line(&line) {
                        app.on_key_input_event(key);
                    }
                }
                None => stdin_open = false,
            },
            _ = ticker.tick() => {
                app.pump_events();
            }
        }
    }

    // `disconnect` joins a thread; keep it off the async workers.
    tokio::task::spawn_blocking(move || app.shutdown()).await?;

    info!("DataSource Test Tool client stopped");
    Ok(())
}
