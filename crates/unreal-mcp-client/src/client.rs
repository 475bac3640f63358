//! Retrying command client.
//!
//! Every call opens a fresh connection, sends one request, reads one
//! response, and drops the socket. Refused connections and socket timeouts
//! are retried with a fixed delay; every other failure is returned at once.

use std::io;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};
use unreal_mcp_config::Config;
use unreal_mcp_types::{CommandRequest, CommandResponse, Params};

use crate::errors::ClientError;
use crate::transport::{self, ReadOutcome};

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Connection and retry settings for a [`Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connect, read, and write timeout for each attempt.
    pub timeout: Duration,
    /// Total connection attempts before giving up; `0` behaves like `1`.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
    /// Largest response the client will buffer.
    pub max_response_bytes: usize,
}

impl ClientSettings {
    /// Derives client settings from the shared configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.host().to_owned(),
            port: config.port(),
            timeout: config.timeout(),
            max_retries: config.max_retries(),
            retry_delay: config.retry_delay(),
            max_response_bytes: config.max_request_bytes(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Failure of a single attempt, classified for the retry loop.
enum AttemptError {
    /// Refused or timed out; another attempt may succeed.
    Retryable(io::Error),
    /// Terminal failure.
    Fatal(ClientError),
}

/// Client for the command server.
#[derive(Debug, Clone, Default)]
pub struct Client {
    settings: ClientSettings,
}

impl Client {
    /// Creates a client with the given settings.
    #[must_use]
    pub const fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    /// Settings used by this client.
    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Sends `request` and returns the normalised response envelope.
    ///
    /// Error envelopes are returned as `Ok`; use [`Client::execute`] to turn
    /// them into [`ClientError::Remote`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connection`] once all attempts were refused or
    /// timed out, and protocol or IO errors from the first attempt that hits
    /// them.
    pub fn send(&self, request: &CommandRequest) -> Result<CommandResponse, ClientError> {
        let payload = request.to_bytes().map_err(ClientError::Serialize)?;
        let attempts = self.settings.max_retries.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(&payload, attempt) {
                Ok(response) => return Ok(response),
                Err(AttemptError::Fatal(error)) => return Err(error),
                Err(AttemptError::Retryable(source)) if attempt < attempts => {
                    warn!(
                        target: CLIENT_TARGET,
                        host = %self.settings.host,
                        port = self.settings.port,
                        attempt,
                        attempts,
                        error = %source,
                        "attempt failed; retrying"
                    );
                    thread::sleep(self.settings.retry_delay);
                    attempt += 1;
                }
                Err(AttemptError::Retryable(source)) => {
                    return Err(self.connection_error(attempt, source));
                }
            }
        }
    }

    /// Sends a command and returns its result bag.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Remote`] for error envelopes and the errors of
    /// [`Client::send`] otherwise.
    pub fn execute(
        &self,
        command_type: impl Into<String>,
        params: Params,
    ) -> Result<Params, ClientError> {
        let request = CommandRequest::new(command_type, params);
        self.send(&request)?
            .into_result()
            .map_err(|message| ClientError::Remote { message })
    }

    /// Returns `true` when a single connection attempt succeeds.
    #[must_use]
    pub fn probe(&self) -> bool {
        let Ok(address) = transport::resolve_tcp_address(&self.settings.host, self.settings.port)
        else {
            return false;
        };
        let reachable = transport::connect(&address, self.settings.timeout).is_ok();
        debug!(target: CLIENT_TARGET, %address, reachable, "probed server");
        reachable
    }

    fn attempt(&self, payload: &[u8], attempt: u32) -> Result<CommandResponse, AttemptError> {
        let address = transport::resolve_tcp_address(&self.settings.host, self.settings.port)
            .map_err(|source| {
                AttemptError::Fatal(ClientError::Resolve {
                    host: self.settings.host.clone(),
                    port: self.settings.port,
                    source,
                })
            })?;

        let mut stream = transport::connect(&address, self.settings.timeout)
            .map_err(|source| self.classify_connect_error(attempt, source))?;
        debug!(target: CLIENT_TARGET, %address, bytes = payload.len(), "sending request");
        self.exchange(&mut stream, payload)
    }

    fn exchange(
        &self,
        stream: &mut TcpStream,
        payload: &[u8],
    ) -> Result<CommandResponse, AttemptError> {
        transport::send_payload(stream, payload).map_err(|source| {
            if is_timeout(&source) {
                AttemptError::Retryable(source)
            } else {
                AttemptError::Fatal(ClientError::Send(source))
            }
        })?;

        match transport::read_response(stream, self.settings.max_response_bytes)
            .map_err(AttemptError::Fatal)?
        {
            ReadOutcome::Value(value) => CommandResponse::from_value(value)
                .map_err(|error| AttemptError::Fatal(error.into())),
            ReadOutcome::Closed => Err(AttemptError::Fatal(ClientError::ConnectionClosed {
                host: self.settings.host.clone(),
                port: self.settings.port,
            })),
            ReadOutcome::Io(source) if is_timeout(&source) => {
                Err(AttemptError::Retryable(source))
            }
            ReadOutcome::Io(source) => Err(AttemptError::Fatal(ClientError::Receive(source))),
        }
    }

    fn classify_connect_error(&self, attempt: u32, source: io::Error) -> AttemptError {
        if is_retryable(&source) {
            AttemptError::Retryable(source)
        } else {
            AttemptError::Fatal(self.connection_error(attempt, source))
        }
    }

    fn connection_error(&self, attempts: u32, source: io::Error) -> ClientError {
        ClientError::Connection {
            host: self.settings.host.clone(),
            port: self.settings.port,
            attempts,
            source,
        }
    }
}

/// Sends `request` to `host:port` using default timeouts and retry policy.
///
/// # Errors
///
/// See [`Client::send`].
pub fn send_command(
    request: &CommandRequest,
    host: &str,
    port: u16,
) -> Result<CommandResponse, ClientError> {
    let client = Client::new(ClientSettings {
        host: host.to_owned(),
        port,
        ..ClientSettings::default()
    });
    client.send(request)
}

fn is_retryable(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::ConnectionRefused || is_timeout(error)
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
