//! Application lifecycle hooks.
//!
//! The host (an HMI runtime, or `main.rs` when running stand-alone) drives
//! the client through a fixed sequence of callbacks:
//!
//! ```text
//! on_configure ─> register_metadata_override ─> on_project_loaded ─> (events, keys)* ─> quit
//! ```
//!
//! `TestToolApplication` is the composition root for the network side: it
//! owns the [`NetworkClient`], starts it once the project is loaded, and
//! turns a server-side close into a quit request.  Dropping the application
//! drops the client, which joins its worker.

use std::sync::mpsc::Receiver;

use tracing::{debug, info, warn};

use crate::infrastructure::network::{NetworkClient, NetworkEvent};

/// How much performance information the host renders on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PerformanceInfoLevel {
    #[default]
    Disabled,
    /// Frame-rate counter only.
    Fps,
    /// Full performance overlay.
    All,
}

/// Host settings adjustable from [`TestToolApplication::on_configure`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationProperties {
    pub performance_info_level: PerformanceInfoLevel,
}

/// Keys the application reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    Escape,
    Q,
    Backspace,
    Other(char),
}

impl InputKey {
    /// Maps a console line to a key: `esc`, `q`, `backspace`, or the line's
    /// first character.  Empty lines map to nothing.
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "" => None,
            "esc" | "escape" => Some(InputKey::Escape),
            "q" | "quit" => Some(InputKey::Q),
            "backspace" => Some(InputKey::Backspace),
            _ => line.chars().next().map(InputKey::Other),
        }
    }

    /// Whether this key ends the application.
    pub fn is_quit_key(self) -> bool {
        matches!(self, InputKey::Escape | InputKey::Q | InputKey::Backspace)
    }
}

/// The test tool application.
pub struct TestToolApplication {
    client: NetworkClient,
    events: Option<Receiver<NetworkEvent>>,
    quit_on_server_close: bool,
    quit_requested: bool,
}

impl TestToolApplication {
    /// Creates the application around an already-configured client.
    pub fn new(client: NetworkClient, quit_on_server_close: bool) -> Self {
        Self {
            client,
            events: None,
            quit_on_server_close,
            quit_requested: false,
        }
    }

    /// The owned network client.
    pub fn client(&self) -> &NetworkClient {
        &self.client
    }

    /// Adjusts host properties before the project loads.
    pub fn on_configure(&self, properties: &mut ApplicationProperties) {
        properties.performance_info_level = PerformanceInfoLevel::Fps;
        info!("on_configure: performance info level set to FPS");
    }

    /// Starts the network client.
    ///
    /// Subscribes before connecting so no event is missed.
    pub fn on_project_loaded(&mut self) {
        info!("on_project_loaded: connecting to {}", self.client.config().server_addr);
        if self.events.is_none() {
            self.events = Some(self.client.subscribe());
        }
        self.client.connect_to_server();
    }

    /// Registers host metadata overrides.  The client contributes none.
    pub fn register_metadata_override(&self) {
        debug!("register_metadata_override: no overrides registered");
    }

    /// Handles a key press; Escape, `Q` and Backspace quit.
    pub fn on_key_input_event(&mut self, key: InputKey) {
        debug!("on_key_input_event: {key:?}");
        if key.is_quit_key() {
            self.quit();
        }
    }

    /// Requests the host to stop.
    pub fn quit(&mut self) {
        if !self.quit_requested {
            info!("quit requested");
        }
        self.quit_requested = true;
    }

    /// Whether [`quit`](Self::quit) has been called.
    pub fn is_quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Drains pending network events and returns how many were handled.
    pub fn pump_events(&mut self) -> usize {
        let Some(events) = self.events.as_ref() else {
            return 0;
        };
        let pending: Vec<NetworkEvent> = events.try_iter().collect();

        for event in &pending {
            match event {
                NetworkEvent::ClosedByServer if self.quit_on_server_close => {
                    warn!("server closed the connection; quitting");
                    self.quit();
                }
                NetworkEvent::ConnectFailed { server_addr, .. } => {
                    warn!("could not reach test tool server at {server_addr}");
                }
                other => debug!("network event: {other:?}"),
            }
        }
        pending.len()
    }

    /// Disconnects the client and waits for its worker to exit.
    pub fn shutdown(&self) {
        info!("shutting down network client");
        self.client.disconnect();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
