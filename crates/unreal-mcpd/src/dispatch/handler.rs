//! Connection handler that decodes one command and answers it.
//!
//! Each connection carries exactly one request and one response. The handler
//! reads fixed-size chunks into a [`FrameDecoder`] until the accumulated
//! bytes parse as a complete JSON value, executes the command through the
//! registry, writes the envelope, and lets the stream close on drop.

use std::io::{self, Read};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};
use unreal_mcp_types::{CommandRequest, CommandResponse, FrameDecoder};

use crate::registry::CommandRegistry;
use crate::transport::ConnectionHandler;

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::response::ResponseWriter;

/// How long unread input is drained after the response has been written.
const LINGER_TIMEOUT: Duration = Duration::from_millis(250);

/// Read sizing applied to every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    /// Size of each socket read.
    pub buffer_size: usize,
    /// Largest frame accepted before the request is rejected.
    pub max_request_bytes: usize,
}

/// Connection handler that parses and dispatches JSON commands.
#[derive(Debug)]
pub struct DispatchConnectionHandler {
    registry: Arc<CommandRegistry>,
    limits: ReadLimits,
    running: Arc<AtomicBool>,
}

impl DispatchConnectionHandler {
    /// Creates a handler bound to `registry`.
    ///
    /// `running` is consulted whenever a read times out; once it turns
    /// `false` the connection is abandoned without a response.
    pub fn new(registry: Arc<CommandRegistry>, limits: ReadLimits, running: Arc<AtomicBool>) -> Self {
        Self {
            registry,
            limits,
            running,
        }
    }

    fn dispatch(&self, mut stream: TcpStream) {
        let outcome = match self.read_request(&mut stream) {
            Ok(Some(value)) => self.execute(value),
            Ok(None) => {
                debug!(
                    target: DISPATCH_TARGET,
                    "connection closed before a complete request"
                );
                return;
            }
            Err(error) if error.is_reportable() => {
                warn!(target: DISPATCH_TARGET, %error, "rejecting malformed request");
                Err(error)
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                return;
            }
        };

        let mut writer = ResponseWriter::new(&mut stream);
        let written = match &outcome {
            Ok(response) => writer.write_response(response),
            Err(error) => writer.write_error(error),
        };
        if let Err(error) = written {
            warn!(target: DISPATCH_TARGET, %error, "failed to write response");
            return;
        }
        linger(&mut stream, self.limits.max_request_bytes);
    }

    fn execute(&self, value: Value) -> Result<CommandResponse, DispatchError> {
        let request = CommandRequest::from_value(value).map_err(|error| {
            let error = DispatchError::from(error);
            warn!(target: DISPATCH_TARGET, %error, "invalid request structure");
            error
        })?;

        debug!(
            target: DISPATCH_TARGET,
            command_type = request.command_type().unwrap_or_default(),
            "dispatching request"
        );

        self.registry
            .execute(request)
            .map(CommandResponse::success)
            .map_err(|error| {
                let error = DispatchError::from(error);
                warn!(target: DISPATCH_TARGET, %error, "command failed");
                error
            })
    }

    /// Reads until the buffered bytes form one JSON value.
    ///
    /// Returns `Ok(None)` when the peer disconnects first, discarding any
    /// partial frame, or when the server stops while the read is idle.
    fn read_request(&self, stream: &mut TcpStream) -> Result<Option<Value>, DispatchError> {
        let mut decoder = FrameDecoder::new(self.limits.max_request_bytes);
        let mut chunk = vec![0_u8; self.limits.buffer_size.max(1)];

        loop {
            let bytes_read = match stream.read(&mut chunk) {
                Ok(bytes_read) => bytes_read,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) if is_timeout(&error) => {
                    if self.running.load(Ordering::SeqCst) {
                        continue;
                    }
                    return Ok(None);
                }
                Err(error) => return Err(error.into()),
            };

            if bytes_read == 0 {
                if !decoder.is_empty() {
                    debug!(
                        target: DISPATCH_TARGET,
                        discarded = decoder.len(),
                        "discarding partial request"
                    );
                }
                return Ok(None);
            }

            let received = chunk.get(..bytes_read).unwrap_or_default();
            if let Some(value) = decoder.feed(received)? {
                return Ok(Some(value));
            }
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: TcpStream) {
        self.dispatch(stream);
    }
}

/// Half-closes the stream and discards leftover input.
///
/// Closing a socket with unread bytes resets the connection, which can
/// destroy the response before the peer reads it.
fn linger(stream: &mut TcpStream, budget: usize) {
    if stream.shutdown(Shutdown::Write).is_err()
        || stream.set_read_timeout(Some(LINGER_TIMEOUT)).is_err()
    {
        return;
    }
    let limit = u64::try_from(budget).unwrap_or(u64::MAX);
    if let Err(error) = io::copy(&mut Read::by_ref(stream).take(limit), &mut io::sink())
        && !is_timeout(&error)
    {
        debug!(target: DISPATCH_TARGET, %error, "failed to drain connection");
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
