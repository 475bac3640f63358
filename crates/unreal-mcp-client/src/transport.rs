//! TCP transport helpers for the client.
//!
//! A connection carries one request and one response. The response is read
//! into a [`FrameDecoder`] until a complete JSON value has arrived or the
//! peer closes the socket.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::Value;
use unreal_mcp_types::FrameDecoder;

use crate::errors::ClientError;

/// Size of each socket read while collecting a response.
pub(crate) const READ_CHUNK: usize = 4096;

pub(crate) fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

/// Opens a stream with `timeout` applied to connect, reads, and writes.
pub(crate) fn connect(address: &SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
    let stream = TcpStream::connect_timeout(address, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Outcome of reading from a connection after the request was sent.
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    /// A complete JSON value arrived.
    Value(Value),
    /// The peer closed the socket before sending anything.
    Closed,
    /// Reading failed at the socket level.
    Io(io::Error),
}

pub(crate) fn send_payload(stream: &mut TcpStream, payload: &[u8]) -> io::Result<()> {
    stream.write_all(payload)?;
    stream.flush()
}

/// Reads until one JSON value decodes, the peer closes, or reading fails.
///
/// # Errors
///
/// Oversized or malformed responses are reported as [`ClientError`]; socket
/// failures are returned in [`ReadOutcome::Io`] so the caller can decide
/// whether to retry.
pub(crate) fn read_response(
    stream: &mut TcpStream,
    max_response_bytes: usize,
) -> Result<ReadOutcome, ClientError> {
    let mut decoder = FrameDecoder::new(max_response_bytes);
    let mut chunk = vec![0_u8; READ_CHUNK];
    loop {
        let read = match stream.read(&mut chunk) {
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Ok(ReadOutcome::Io(error)),
        };
        if read == 0 {
            if decoder.is_empty() {
                return Ok(ReadOutcome::Closed);
            }
            return Err(ClientError::Protocol {
                message: format!(
                    "connection closed after {} byte(s) of an incomplete response",
                    decoder.len()
                ),
            });
        }
        let received = chunk.get(..read).unwrap_or_default();
        if let Some(value) = decoder.feed(received)? {
            return Ok(ReadOutcome::Value(value));
        }
    }
}
