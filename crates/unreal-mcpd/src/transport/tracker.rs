//! Bookkeeping for live connections.

use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::LISTENER_TARGET;

/// Set of live connections keyed by peer address.
///
/// The tracker keeps a cloned handle of every accepted stream so that
/// shutdown can close connections that are still waiting on a read.
#[derive(Debug, Default)]
pub(crate) struct ConnectionTracker {
    connections: Mutex<HashMap<SocketAddr, TcpStream>>,
}

impl ConnectionTracker {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records `stream` and returns a guard that forgets it on drop.
    pub(crate) fn track(
        self: &Arc<Self>,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> io::Result<TrackedConnection> {
        let handle = stream.try_clone()?;
        self.lock().insert(peer, handle);
        debug!(target: LISTENER_TARGET, %peer, "connection accepted");
        Ok(TrackedConnection {
            stream: Some(stream),
            peer,
            tracker: Arc::clone(self),
        })
    }

    /// Number of connections accepted and not yet finished.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Shuts down every live connection and returns how many were closed.
    ///
    /// Entries stay registered until their workers finish with them.
    pub(crate) fn close_all(&self) -> usize {
        let connections = self.lock();
        for (peer, stream) in connections.iter() {
            if let Err(error) = stream.shutdown(Shutdown::Both)
                && error.kind() != io::ErrorKind::NotConnected
            {
                debug!(
                    target: LISTENER_TARGET,
                    %peer,
                    %error,
                    "failed to close connection"
                );
            }
        }
        connections.len()
    }

    fn release(&self, peer: SocketAddr) {
        if self.lock().remove(&peer).is_some() {
            debug!(target: LISTENER_TARGET, %peer, "connection released");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SocketAddr, TcpStream>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Accepted connection registered with a [`ConnectionTracker`].
#[derive(Debug)]
pub(crate) struct TrackedConnection {
    stream: Option<TcpStream>,
    peer: SocketAddr,
    tracker: Arc<ConnectionTracker>,
}

impl TrackedConnection {
    /// Takes the stream out of the guard; registration ends when the guard
    /// drops.
    pub(crate) fn take_stream(&mut self) -> Option<TcpStream> {
        self.stream.take()
    }

    pub(crate) fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Drop for TrackedConnection {
    fn drop(&mut self) {
        drop(self.stream.take());
        self.tracker.release(self.peer);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::net::TcpListener;

    use super::*;

    fn connected_pair() -> (TcpStream, TcpStream, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let client =
            TcpStream::connect(listener.local_addr().expect("address")).expect("connect client");
        let (server, peer) = listener.accept().expect("accept client");
        (client, server, peer)
    }

    #[test]
    fn guards_release_their_connection_on_drop() {
        let tracker = ConnectionTracker::new();
        let (_client, server, peer) = connected_pair();

        let guard = tracker.track(server, peer).expect("track connection");
        assert_eq!(tracker.len(), 1);
        assert_eq!(guard.peer(), peer);

        drop(guard);
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn close_all_shuts_down_live_streams() {
        let tracker = ConnectionTracker::new();
        let (mut client, server, peer) = connected_pair();
        let _guard = tracker.track(server, peer).expect("track connection");

        assert_eq!(tracker.close_all(), 1);

        let mut buffer = [0_u8; 8];
        let read = client.read(&mut buffer).expect("read after close");
        assert_eq!(read, 0, "client should observe end of stream");
    }
}
