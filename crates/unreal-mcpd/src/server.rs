//! Command server lifecycle.
//!
//! [`Server`] owns the listening socket, the worker pool, the set of live
//! connections, and the optional PID file. It moves through
//! `Stopped → Starting → Running → Stopping → Stopped`; [`Server::start`]
//! returns once the listener is accepting, and [`Server::stop`] tears
//! everything down again.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::{info, warn};
use unreal_mcp_config::Config;

use crate::dispatch::{DispatchConnectionHandler, ReadLimits};
use crate::process::{PidFile, PidFileError};
use crate::registry::{CommandHandler, CommandRegistry};
use crate::transport::{
    ConnectionHandler, ConnectionTracker, ListenerError, ListenerHandle, ListenerOptions,
    SocketListener,
};

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Lifecycle states of a [`Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Not accepting connections.
    Stopped,
    /// Acquiring the PID file and binding the socket.
    Starting,
    /// Accepting and serving connections.
    Running,
    /// Closing connections and draining workers.
    Stopping,
}

/// Settings consumed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Interface to bind.
    pub host: String,
    /// Port to bind; `0` selects an ephemeral port.
    pub port: u16,
    /// Worker pool size.
    pub max_connections: usize,
    /// Size of each socket read.
    pub buffer_size: usize,
    /// Largest accepted request frame.
    pub max_request_bytes: usize,
    /// Read and write timeout applied to accepted connections.
    pub timeout: Duration,
    /// PID file written while running, if any.
    pub pid_file: Option<Utf8PathBuf>,
}

impl ServerSettings {
    /// Derives server settings from the shared configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.host().to_owned(),
            port: config.port(),
            max_connections: config.max_connections(),
            buffer_size: config.buffer_size(),
            max_request_bytes: config.max_request_bytes(),
            timeout: config.timeout(),
            pid_file: Some(config.pid_file().to_owned()),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Errors raised by server lifecycle operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `start` was called while the server was not stopped.
    #[error("server is already {state:?}")]
    AlreadyStarted {
        /// State observed when `start` was called.
        state: ServerState,
    },
    /// The PID file could not be acquired.
    #[error(transparent)]
    PidFile(#[from] PidFileError),
    /// The listening socket could not be bound or run.
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

#[derive(Debug)]
struct Runtime {
    state: ServerState,
    listener: Option<ListenerHandle>,
    pid_file: Option<PidFile>,
    local_addr: Option<SocketAddr>,
}

/// TCP command server backed by a [`CommandRegistry`].
#[derive(Debug)]
pub struct Server {
    settings: ServerSettings,
    registry: Arc<CommandRegistry>,
    running: Arc<AtomicBool>,
    tracker: Arc<ConnectionTracker>,
    runtime: Mutex<Runtime>,
}

impl Server {
    /// Creates a stopped server that dispatches through `registry`.
    #[must_use]
    pub fn new(settings: ServerSettings, registry: CommandRegistry) -> Self {
        Self {
            settings,
            registry: Arc::new(registry),
            running: Arc::new(AtomicBool::new(false)),
            tracker: ConnectionTracker::new(),
            runtime: Mutex::new(Runtime {
                state: ServerState::Stopped,
                listener: None,
                pid_file: None,
                local_addr: None,
            }),
        }
    }

    /// Creates a stopped server configured from `config`.
    #[must_use]
    pub fn from_config(config: &Config, registry: CommandRegistry) -> Self {
        Self::new(ServerSettings::from_config(config), registry)
    }

    /// Registers `handler` for `command_type` on the underlying registry.
    pub fn register_command<H>(&self, command_type: impl Into<String>, handler: H)
    where
        H: CommandHandler + 'static,
    {
        self.registry.register(command_type, handler);
    }

    /// Shared handle to the command registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Settings the server was built with.
    #[must_use]
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.lock_runtime().state
    }

    /// Returns `true` while the server accepts connections.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// Bound address while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_runtime().local_addr
    }

    /// Number of accepted connections that have not finished.
    #[must_use]
    pub fn live_connections(&self) -> usize {
        self.tracker.len()
    }

    /// Writes the PID file, binds the socket, and starts accepting.
    ///
    /// Returns the bound address. The accept loop and workers run on
    /// background threads until [`Server::stop`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyStarted`] unless the server is stopped,
    /// and PID file or listener errors when startup fails; the server is
    /// left stopped in that case.
    pub fn start(&self) -> Result<SocketAddr, ServerError> {
        let mut runtime = self.lock_runtime();
        if runtime.state != ServerState::Stopped {
            return Err(ServerError::AlreadyStarted {
                state: runtime.state,
            });
        }
        runtime.state = ServerState::Starting;

        match self.launch() {
            Ok((listener, pid_file, addr)) => {
                runtime.listener = Some(listener);
                runtime.pid_file = pid_file;
                runtime.local_addr = Some(addr);
                runtime.state = ServerState::Running;
                info!(
                    target: SERVER_TARGET,
                    %addr,
                    workers = self.settings.max_connections,
                    commands = self.registry.len(),
                    "command server running"
                );
                Ok(addr)
            }
            Err(error) => {
                self.running.store(false, Ordering::SeqCst);
                runtime.state = ServerState::Stopped;
                warn!(target: SERVER_TARGET, %error, "command server failed to start");
                Err(error)
            }
        }
    }

    fn launch(&self) -> Result<(ListenerHandle, Option<PidFile>, SocketAddr), ServerError> {
        let pid_file = self
            .settings
            .pid_file
            .as_deref()
            .map(PidFile::acquire)
            .transpose()?;
        let listener = SocketListener::bind(&self.settings.host, self.settings.port)?;
        let addr = listener.local_addr();

        self.running.store(true, Ordering::SeqCst);
        let handler: Arc<dyn ConnectionHandler> = Arc::new(DispatchConnectionHandler::new(
            Arc::clone(&self.registry),
            ReadLimits {
                buffer_size: self.settings.buffer_size,
                max_request_bytes: self.settings.max_request_bytes,
            },
            Arc::clone(&self.running),
        ));
        let options = ListenerOptions {
            workers: self.settings.max_connections,
            socket_timeout: self.settings.timeout,
        };
        let handle = listener.start(
            options,
            handler,
            Arc::clone(&self.tracker),
            Arc::clone(&self.running),
        )?;
        Ok((handle, pid_file, addr))
    }

    /// Stops accepting, closes live connections, drains the worker pool, and
    /// removes the PID file.
    ///
    /// Calling `stop` on a server that is not running does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Listener`] when the accept thread or a worker
    /// panicked. The server still ends up stopped.
    pub fn stop(&self) -> Result<(), ServerError> {
        let mut runtime = self.lock_runtime();
        if runtime.state != ServerState::Running {
            return Ok(());
        }
        runtime.state = ServerState::Stopping;
        info!(target: SERVER_TARGET, "command server stopping");

        self.running.store(false, Ordering::SeqCst);
        let closed = self.tracker.close_all();
        let joined = match runtime.listener.take() {
            Some(listener) => {
                listener.shutdown();
                listener.join()
            }
            None => Ok(()),
        };
        drop(runtime.pid_file.take());
        runtime.local_addr = None;
        runtime.state = ServerState::Stopped;
        info!(
            target: SERVER_TARGET,
            closed_connections = closed,
            "command server stopped"
        );
        joined.map_err(ServerError::from)
    }

    fn lock_runtime(&self) -> MutexGuard<'_, Runtime> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(target: SERVER_TARGET, %error, "command server did not stop cleanly");
        }
    }
}
