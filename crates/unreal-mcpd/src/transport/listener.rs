//! Listener implementation for the command server socket.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{info, warn};

use super::pool::WorkerPool;
use super::{ConnectionHandler, ConnectionTracker, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const LISTEN_BACKLOG: i32 = 128;

/// Runtime options applied to the accept loop and accepted streams.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ListenerOptions {
    /// Number of workers, and the depth of the pending-connection queue.
    pub(crate) workers: usize,
    /// Read and write timeout applied to every accepted stream.
    pub(crate) socket_timeout: Duration,
}

/// Listener bound to a TCP address.
#[derive(Debug)]
pub(crate) struct SocketListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl SocketListener {
    /// Resolves `host:port` and binds the first usable address with
    /// `SO_REUSEADDR` set.
    pub(crate) fn bind(host: &str, port: u16) -> Result<Self, ListenerError> {
        let addr = resolve(host, port)?;
        let listener = bind_reusable(addr)?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address the listener is bound to, with any ephemeral port resolved.
    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts the accept loop and its worker pool on background threads.
    ///
    /// The loop runs while `running` stays `true`.
    pub(crate) fn start(
        self,
        options: ListenerOptions,
        handler: Arc<dyn ConnectionHandler>,
        tracker: Arc<ConnectionTracker>,
        running: Arc<AtomicBool>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let pool = WorkerPool::spawn(options.workers, &handler, &running)?;
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("mcp-accept".to_owned())
            .spawn(move || run_accept_loop(&self, options, &tracker, pool, &flag))
            .map_err(|source| ListenerError::Spawn {
                role: "accept",
                source,
            })?;
        Ok(ListenerHandle {
            running,
            handle: Some(handle),
        })
    }
}

/// Handle to the background accept thread.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<Result<(), ListenerError>>>,
}

impl ListenerHandle {
    pub(crate) fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Waits for the accept loop to close the socket and drain the pool.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic)?,
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    options: ListenerOptions,
    tracker: &Arc<ConnectionTracker>,
    pool: WorkerPool,
    running: &AtomicBool,
) -> Result<(), ListenerError> {
    info!(
        target: LISTENER_TARGET,
        addr = %listener.local_addr,
        workers = options.workers,
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while running.load(Ordering::SeqCst) {
        match accept_connection(listener, options.socket_timeout) {
            Ok(Some((stream, peer))) => {
                last_error = None;
                match tracker.track(stream, peer) {
                    Ok(connection) => {
                        pool.submit(connection, running);
                    }
                    Err(error) => {
                        warn!(
                            target: LISTENER_TARGET,
                            %peer,
                            %error,
                            "failed to register connection"
                        );
                    }
                }
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    info!(
        target: LISTENER_TARGET,
        addr = %listener.local_addr,
        "socket listener stopping"
    );
    pool.shutdown()
}

fn accept_connection(
    listener: &SocketListener,
    timeout: Duration,
) -> Result<Option<(TcpStream, SocketAddr)>, io::Error> {
    match listener.listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            stream.set_read_timeout(Some(timeout))?;
            stream.set_write_timeout(Some(timeout))?;
            Ok(Some((stream, peer)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })
}

fn bind_reusable(addr: SocketAddr) -> Result<TcpListener, ListenerError> {
    let bind_error = |source| ListenerError::BindTcp { addr, source };
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(bind_error)?;
    socket.set_reuse_address(true).map_err(bind_error)?;
    socket.bind(&addr.into()).map_err(bind_error)?;
    socket.listen(LISTEN_BACKLOG).map_err(bind_error)?;
    Ok(socket.into())
}
