//! Connection handling abstraction for the worker pool.

use std::net::TcpStream;

/// Consumes one accepted connection.
///
/// Implementations own the stream for the duration of the call; it is closed
/// when dropped.
pub(crate) trait ConnectionHandler: Send + Sync {
    /// Serves the connection to completion.
    fn handle(&self, stream: TcpStream);
}
