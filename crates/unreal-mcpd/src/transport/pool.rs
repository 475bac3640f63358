//! Fixed-size worker pool fed by a bounded connection queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};
use tracing::{debug, warn};

use super::tracker::TrackedConnection;
use super::{ConnectionHandler, LISTENER_TARGET, ListenerError};

/// How long a full queue blocks the accept loop before the running flag is
/// checked again.
const QUEUE_BACKOFF: Duration = Duration::from_millis(25);

/// Workers that serve queued connections with a shared handler.
pub(super) struct WorkerPool {
    sender: Option<Sender<TrackedConnection>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers behind a queue holding at most `size` pending
    /// connections.
    pub(super) fn spawn(
        size: usize,
        handler: &Arc<dyn ConnectionHandler>,
        running: &Arc<AtomicBool>,
    ) -> Result<Self, ListenerError> {
        let size = size.max(1);
        let (sender, receiver) = bounded::<TrackedConnection>(size);
        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = receiver.clone();
            let handler = Arc::clone(handler);
            let running = Arc::clone(running);
            let worker = thread::Builder::new()
                .name(format!("mcp-worker-{index}"))
                .spawn(move || run_worker(&receiver, handler.as_ref(), &running))
                .map_err(|source| ListenerError::Spawn {
                    role: "worker",
                    source,
                })?;
            workers.push(worker);
        }
        debug!(target: LISTENER_TARGET, workers = size, "worker pool started");
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// Queues `connection`, waiting while the pool is saturated.
    ///
    /// Returns `false` when the connection was dropped because the server is
    /// stopping or the workers are gone.
    pub(super) fn submit(&self, connection: TrackedConnection, running: &AtomicBool) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        let mut pending = connection;
        loop {
            match sender.send_timeout(pending, QUEUE_BACKOFF) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(connection)) => {
                    if !running.load(Ordering::SeqCst) {
                        debug!(
                            target: LISTENER_TARGET,
                            peer = %connection.peer(),
                            "dropping queued connection during shutdown"
                        );
                        return false;
                    }
                    pending = connection;
                }
                Err(SendTimeoutError::Disconnected(connection)) => {
                    warn!(
                        target: LISTENER_TARGET,
                        peer = %connection.peer(),
                        "worker pool unavailable; dropping connection"
                    );
                    return false;
                }
            }
        }
    }

    /// Closes the queue and waits for every worker to drain and exit.
    pub(super) fn shutdown(mut self) -> Result<(), ListenerError> {
        drop(self.sender.take());
        let mut panicked = false;
        for worker in self.workers.drain(..) {
            panicked |= worker.join().is_err();
        }
        if panicked {
            return Err(ListenerError::ThreadPanic);
        }
        debug!(target: LISTENER_TARGET, "worker pool stopped");
        Ok(())
    }
}

fn run_worker(
    receiver: &Receiver<TrackedConnection>,
    handler: &dyn ConnectionHandler,
    running: &AtomicBool,
) {
    while let Ok(mut connection) = receiver.recv() {
        // Connections still queued at shutdown have already been closed.
        if !running.load(Ordering::SeqCst) {
            continue;
        }
        if let Some(stream) = connection.take_stream() {
            handler.handle(stream);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{TcpListener, TcpStream};
    use std::time::Instant;

    use super::*;
    use crate::transport::{ConnectionTracker, CountingHandler};

    fn accept_tracked(tracker: &Arc<ConnectionTracker>) -> (TcpStream, TrackedConnection) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let client =
            TcpStream::connect(listener.local_addr().expect("address")).expect("connect client");
        let (server, peer) = listener.accept().expect("accept client");
        let tracked = tracker.track(server, peer).expect("track connection");
        (client, tracked)
    }

    #[test]
    fn workers_serve_submitted_connections_and_release_them() {
        let (count, handler) = CountingHandler::new();
        let handler: Arc<dyn ConnectionHandler> = handler;
        let running = Arc::new(AtomicBool::new(true));
        let tracker = ConnectionTracker::new();
        let pool = WorkerPool::spawn(2, &handler, &running).expect("spawn pool");

        let mut clients = Vec::new();
        for _ in 0..3 {
            let (client, tracked) = accept_tracked(&tracker);
            clients.push(client);
            assert!(pool.submit(tracked, &running));
        }

        let deadline = Instant::now() + Duration::from_secs(2);
        while count.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        pool.shutdown().expect("shutdown pool");
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn queued_connections_are_skipped_once_stopping() {
        let (count, handler) = CountingHandler::new();
        let handler: Arc<dyn ConnectionHandler> = handler;
        let running = Arc::new(AtomicBool::new(false));
        let tracker = ConnectionTracker::new();
        let pool = WorkerPool::spawn(1, &handler, &running).expect("spawn pool");

        let (_client, tracked) = accept_tracked(&tracker);
        let _ = pool.submit(tracked, &running);
        pool.shutdown().expect("shutdown pool");

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.len(), 0);
    }
}
