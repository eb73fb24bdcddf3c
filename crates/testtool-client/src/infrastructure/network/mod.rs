//! Network infrastructure for the client application.
//!
//! Maintains a single best-effort TCP connection to the test tool server and
//! surfaces received bytes as text.
//!
//! Architecture:
//! - `NetworkClient` owns at most one background worker thread.
//! - The worker performs every blocking socket call (connect, read) and hands
//!   each received chunk to a [`MessageSink`].
//! - The only state shared with the owner is the `connected` flag and a small
//!   stop slot holding a clone of the socket, so that `disconnect()` can shut
//!   the socket down and unblock a read that is waiting on an idle server.
//! - Status changes are published as [`NetworkEvent`]s to any number of
//!   `mpsc` subscribers.
//!
//! There is no framing and no reconnection: EOF, a read error, or a failed
//! connect all end the worker, after which `is_connected()` reports `false`.

use std::io::{ErrorKind, Read};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use testtool_core::{
    ConnectionState, ServerPreset, DEFAULT_CONNECT_TIMEOUT_MS, MAX_RECEIVE_BUFFER_SIZE,
    RECEIVE_BUFFER_SIZE,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::infrastructure::output::{MessageSink, StdoutSink};

/// Errors that can occur in the client network layer.
///
/// None of these reach the caller of [`NetworkClient::connect_to_server`];
/// they are logged and published as [`NetworkEvent`]s.
#[derive(Debug, Error)]
pub enum ClientNetworkError {
    /// TCP connection to the server failed.
    #[error("failed to connect to server at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The OS refused to create the worker thread.
    #[error("failed to spawn network worker: {0}")]
    SpawnFailed(#[source] std::io::Error),
}

/// Configuration for the client's network connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConnectionConfig {
    /// Address of the server's command port.
    pub server_addr: SocketAddr,
    /// Size of the receive buffer filled by each read, clamped to
    /// `1..=MAX_RECEIVE_BUFFER_SIZE` when the worker allocates it.
    pub buffer_size: usize,
    /// Upper bound for the connect attempt; `None` uses the OS default.
    pub connect_timeout: Option<Duration>,
}

impl ClientConnectionConfig {
    /// Configuration pointing at one of the named server presets.
    pub fn for_preset(preset: ServerPreset) -> Self {
        Self {
            server_addr: preset.socket_addr(),
            buffer_size: RECEIVE_BUFFER_SIZE,
            connect_timeout: Some(Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS)),
        }
    }
}

impl Default for ClientConnectionConfig {
    fn default() -> Self {
        Self::for_preset(ServerPreset::platform_default())
    }
}

/// Events emitted by the network worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// The TCP connection was established.
    Connected { server_addr: SocketAddr },
    /// The connect attempt failed; the worker has exited.
    ConnectFailed {
        server_addr: SocketAddr,
        reason: String,
    },
    /// A chunk of text was read from the server.
    MessageReceived(String),
    /// The server closed its side of the connection (EOF).
    ClosedByServer,
    /// A read failed for a reason other than EOF or a local disconnect.
    ReadFailed(String),
    /// The read loop ended and the socket was released.
    Disconnected,
}

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// Every critical section here leaves the data consistent, so a poisoned lock
/// carries no broken invariant.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Event fan-out ─────────────────────────────────────────────────────────────

/// Subscriber list shared between the owner and the worker.
#[derive(Default)]
struct Subscribers {
    senders: Mutex<Vec<Sender<NetworkEvent>>>,
}

impl Subscribers {
    fn subscribe(&self) -> Receiver<NetworkEvent> {
        let (tx, rx) = mpsc::channel();
        lock(&self.senders).push(tx);
        rx
    }

    /// Sends `event` to every live subscriber and forgets dropped ones.
    fn emit(&self, event: NetworkEvent) {
        lock(&self.senders).retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock(&self.senders).len()
    }
}

// ── Stop control ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct StopSlot {
    stream: Option<TcpStream>,
    stop_requested: bool,
    finished: bool,
}

/// Per-worker cancellation handle.
///
/// The worker registers a clone of its socket after connecting; the owner
/// requests a stop, which shuts that socket down so a blocked `read` returns.
/// Both sides go through the same mutex, so a stop requested while the
/// connect is still in flight is seen by `register`.
#[derive(Default)]
struct StopControl {
    slot: Mutex<StopSlot>,
}

impl StopControl {
    /// Stores the socket clone; returns `false` if a stop already happened.
    fn register(&self, stream: TcpStream) -> bool {
        let mut slot = lock(&self.slot);
        if slot.stop_requested {
            let _ = stream.shutdown(Shutdown::Both);
            return false;
        }
        slot.stream = Some(stream);
        true
    }

    fn request_stop(&self) {
        let mut slot = lock(&self.slot);
        slot.stop_requested = true;
        if let Some(stream) = slot.stream.as_ref() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!("socket shutdown on disconnect failed: {e}");
            }
        }
    }

    fn stop_requested(&self) -> bool {
        lock(&self.slot).stop_requested
    }

    /// Releases the socket clone and marks the worker as done with I/O.
    fn finish(&self) {
        let mut slot = lock(&self.slot);
        slot.stream = None;
        slot.finished = true;
    }

    fn is_finished(&self) -> bool {
        lock(&self.slot).finished
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

struct Worker {
    handle: JoinHandle<()>,
    control: Arc<StopControl>,
}

impl Worker {
    /// A worker that has finished its I/O counts as gone even if the thread
    /// is still publishing its last events; joining it is then immediate.
    fn is_alive(&self) -> bool {
        !self.control.is_finished() && !self.handle.is_finished()
    }

    fn join(self) {
        if self.handle.join().is_err() {
            error!("network worker panicked");
        }
    }
}

/// Everything the worker thread needs, moved into it at spawn time.
struct WorkerContext {
    config: ClientConnectionConfig,
    sink: Arc<dyn MessageSink>,
    connected: Arc<AtomicBool>,
    subscribers: Arc<Subscribers>,
    control: Arc<StopControl>,
}

impl WorkerContext {
    fn run(self) {
        // A panicking sink must not leave the client reporting a live
        // connection; the socket is dropped while unwinding.
        let final_events = match panic::catch_unwind(AssertUnwindSafe(|| self.session())) {
            Ok(events) => events,
            Err(_) => {
                error!(
                    "network worker panicked; connection to {} dropped",
                    self.config.server_addr
                );
                vec![NetworkEvent::Disconnected]
            }
        };

        self.connected.store(false, Ordering::Release);
        self.control.finish();
        for event in final_events {
            self.subscribers.emit(event);
        }
    }

    /// Connects and reads; returns the events describing how it ended.
    fn session(&self) -> Vec<NetworkEvent> {
        let addr = self.config.server_addr;
        info!("attempting to connect to {addr}");

        let (stream, shutdown_handle) = match open_stream(&self.config) {
            Ok(pair) => pair,
            Err(e) => {
                warn!("{e}");
                return vec![NetworkEvent::ConnectFailed {
                    server_addr: addr,
                    reason: e.to_string(),
                }];
            }
        };

        if !self.control.register(shutdown_handle) {
            info!("disconnect requested before the connection to {addr} completed");
            return Vec::new();
        }

        let buffer = vec![0u8; self.config.buffer_size.clamp(1, MAX_RECEIVE_BUFFER_SIZE)];
        self.connected.store(true, Ordering::Release);
        info!("connected to server at {addr}");
        self.subscribers.emit(NetworkEvent::Connected { server_addr: addr });

        let mut events: Vec<NetworkEvent> = self.read_loop(stream, buffer).into_iter().collect();
        info!("disconnected from server at {addr}");
        events.push(NetworkEvent::Disconnected);
        events
    }

    /// Reads until EOF, an error, or a disconnect request.
    ///
    /// Returns the event for a server-side ending; a local disconnect
    /// returns `None`.
    fn read_loop(&self, mut stream: TcpStream, mut buffer: Vec<u8>) -> Option<NetworkEvent> {

        while self.connected.load(Ordering::Acquire) {
            match stream.read(&mut buffer) {
                Ok(0) => {
                    // A local shutdown also reads as EOF.
                    if self.control.stop_requested() {
                        debug!("read loop stopped by disconnect");
                        return None;
                    }
                    info!("connection closed by server");
                    return Some(NetworkEvent::ClosedByServer);
                }
                Ok(n) => {
                    let text = String::from_utf8_lossy(&buffer[..n]).into_owned();
                    debug!(bytes = n, "received data");
                    self.sink.deliver(&text);
                    self.subscribers.emit(NetworkEvent::MessageReceived(text));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    if self.control.stop_requested() {
                        debug!("read interrupted by disconnect: {e}");
                        return None;
                    }
                    error!("read error on command channel: {e}");
                    return Some(NetworkEvent::ReadFailed(e.to_string()));
                }
            }
        }
        None
    }
}

/// Connects to the configured server and returns the stream together with a
/// clone used only for shutdown.
fn open_stream(
    config: &ClientConnectionConfig,
) -> Result<(TcpStream, TcpStream), ClientNetworkError> {
    let addr = config.server_addr;
    let stream = match config.connect_timeout {
        Some(timeout) if !timeout.is_zero() => TcpStream::connect_timeout(&addr, timeout),
        _ => TcpStream::connect(addr),
    }
    .map_err(|source| ClientNetworkError::ConnectFailed { addr, source })?;
    let shutdown_handle = stream.try_clone()?;
    Ok((stream, shutdown_handle))
}

// ── NetworkClient ─────────────────────────────────────────────────────────────

static INSTANCE: OnceLock<NetworkClient> = OnceLock::new();

/// TCP client for the test tool server.
///
/// Normally constructed once by the application's composition root and owned
/// there; [`NetworkClient::instance`] offers a process-wide alternative.
/// Dropping a client disconnects it and joins its worker.
pub struct NetworkClient {
    config: ClientConnectionConfig,
    sink: Arc<dyn MessageSink>,
    connected: Arc<AtomicBool>,
    subscribers: Arc<Subscribers>,
    worker: Mutex<Option<Worker>>,
}

impl NetworkClient {
    /// Creates a new (not yet connected) client.
    pub fn new(config: ClientConnectionConfig, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            config,
            sink,
            connected: Arc::new(AtomicBool::new(false)),
            subscribers: Arc::new(Subscribers::default()),
            worker: Mutex::new(None),
        }
    }

    /// Returns the process-wide client, creating it on first use with the
    /// platform default endpoint and a stdout sink.
    ///
    /// Statics are never dropped, so callers of the shared instance must call
    /// [`disconnect`](Self::disconnect) themselves before exiting.
    pub fn instance() -> &'static NetworkClient {
        INSTANCE.get_or_init(|| {
            NetworkClient::new(ClientConnectionConfig::default(), Arc::new(StdoutSink))
        })
    }

    /// The configuration this client connects with.
    pub fn config(&self) -> &ClientConnectionConfig {
        &self.config
    }

    /// Starts the worker thread unless one is already connected or running.
    ///
    /// Returns immediately; the outcome is reported through logs,
    /// [`subscribe`](Self::subscribe) and [`is_connected`](Self::is_connected).
    pub fn connect_to_server(&self) {
        if self.is_connected() {
            debug!("already connected; connect request ignored");
            return;
        }

        let mut slot = lock(&self.worker);
        if slot.as_ref().is_some_and(Worker::is_alive) {
            debug!("network worker already running; connect request ignored");
            return;
        }
        if let Some(finished) = slot.take() {
            finished.join();
        }

        match self.spawn_worker() {
            Ok(worker) => *slot = Some(worker),
            Err(e) => error!("{e}"),
        }
    }

    /// Stops the read loop and waits for the worker thread to exit.
    ///
    /// A read blocked on an idle server is released by shutting the socket
    /// down.  Safe to call when nothing is running.
    pub fn disconnect(&self) {
        let mut slot = lock(&self.worker);
        self.connected.store(false, Ordering::Release);
        if let Some(worker) = slot.take() {
            worker.control.request_stop();
            worker.join();
            debug!("network worker joined");
        }
    }

    /// Whether the worker currently believes the socket is connected.
    ///
    /// Non-blocking; the value can be stale by the time the caller uses it.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Current position in the connection lifecycle.
    pub fn state(&self) -> ConnectionState {
        let worker_alive = lock(&self.worker).as_ref().is_some_and(Worker::is_alive);
        ConnectionState::from_flags(worker_alive, self.is_connected())
    }

    /// Registers a new event subscriber.
    ///
    /// Events emitted before this call are not replayed.
    pub fn subscribe(&self) -> Receiver<NetworkEvent> {
        self.subscribers.subscribe()
    }

    fn spawn_worker(&self) -> Result<Worker, ClientNetworkError> {
        let control = Arc::new(StopControl::default());
        let context = WorkerContext {
            config: self.config.clone(),
            sink: Arc::clone(&self.sink),
            connected: Arc::clone(&self.connected),
            subscribers: Arc::clone(&self.subscribers),
            control: Arc::clone(&control),
        };

        let handle = thread::Builder::new()
            .name("testtool-network".to_string())
            .spawn(move || context.run())
            .map_err(ClientNetworkError::SpawnFailed)?;

        Ok(Worker { handle, control })
    }
}

impl Drop for NetworkClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::output::mock::RecordingSink;
    use std::net::TcpListener;
    use std::time::Instant;

    fn recording_client(addr: SocketAddr) -> NetworkClient {
        let config = ClientConnectionConfig {
            server_addr: addr,
            connect_timeout: Some(Duration::from_secs(2)),
            ..ClientConnectionConfig::default()
        };
        NetworkClient::new(config, Arc::new(RecordingSink::new()))
    }

    #[test]
    fn test_client_connection_config_default_has_expected_port() {
        // Arrange / Act
        let cfg = ClientConnectionConfig::default();

        // Assert
        assert_eq!(cfg.server_addr.port(), 22207);
        assert_eq!(cfg.buffer_size, 1024);
        assert_eq!(cfg.connect_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_client_connection_config_default_follows_platform_preset() {
        let cfg = ClientConnectionConfig::default();
        assert_eq!(
            cfg.server_addr,
            ServerPreset::platform_default().socket_addr()
        );
    }

    #[test]
    fn test_new_client_is_not_connected() {
        // Arrange / Act
        let client = NetworkClient::new(
            ClientConnectionConfig::default(),
            Arc::new(RecordingSink::new()),
        );

        // Assert
        assert!(!client.is_connected());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(lock(&client.worker).is_none());
    }

    #[test]
    fn test_disconnect_without_connect_returns_promptly() {
        // Arrange
        let client = NetworkClient::new(
            ClientConnectionConfig::default(),
            Arc::new(RecordingSink::new()),
        );
        let started = Instant::now();

        // Act – twice, to show it is idempotent
        client.disconnect();
        client.disconnect();

        // Assert
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(!client.is_connected());
    }

    #[test]
    fn test_instance_returns_the_same_client() {
        let a = NetworkClient::instance();
        let b = NetworkClient::instance();
        assert!(std::ptr::eq(a, b));
        assert!(!a.is_connected());
    }

    #[test]
    fn test_subscribers_drop_closed_receivers() {
        // Arrange
        let subscribers = Subscribers::default();
        let kept = subscribers.subscribe();
        let dropped = subscribers.subscribe();
        drop(dropped);

        // Act
        subscribers.emit(NetworkEvent::ClosedByServer);

        // Assert
        assert_eq!(subscribers.len(), 1);
        assert_eq!(kept.try_recv(), Ok(NetworkEvent::ClosedByServer));
    }

    #[test]
    fn test_stop_control_rejects_registration_after_stop() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let control = StopControl::default();

        // Act
        control.request_stop();
        let registered = control.register(stream);

        // Assert
        assert!(!registered);
        assert!(control.stop_requested());
    }

    #[test]
    fn test_stop_control_shutdown_unblocks_read() {
        // Arrange: an idle server that never writes
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (_server_side, _) = listener.accept().unwrap();
        let control = Arc::new(StopControl::default());
        assert!(control.register(stream.try_clone().unwrap()));

        let reader = thread::spawn(move || {
            let mut buf = [0u8; 16];
            stream.read(&mut buf)
        });
        thread::sleep(Duration::from_millis(50));

        // Act
        control.request_stop();

        // Assert: the blocked read returns (EOF or error) instead of hanging
        let result = reader.join().unwrap();
        assert!(matches!(result, Ok(0) | Err(_)));
    }

    #[test]
    fn test_connect_after_finished_worker_spawns_a_new_one() {
        // Arrange: a port with no listener, so each worker ends quickly
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let client = recording_client(addr);
        let events = client.subscribe();

        // Act
        client.connect_to_server();
        let first = events.recv_timeout(Duration::from_secs(5)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while client.state() != ConnectionState::Disconnected && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        client.connect_to_server();
        let second = events.recv_timeout(Duration::from_secs(5)).unwrap();

        // Assert
        assert!(matches!(first, NetworkEvent::ConnectFailed { .. }));
        assert!(matches!(second, NetworkEvent::ConnectFailed { .. }));
        client.disconnect();
        assert!(lock(&client.worker).is_none());
    }
}
