//! Error types for the client library and CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use unreal_mcp_types::{FrameError, ResponseError};

/// Errors surfaced while sending a command to the server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server address could not be resolved.
    #[error("failed to resolve server address {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// No connection could be established or kept open.
    #[error("failed to connect to {host}:{port} after {attempts} attempt(s): {source}")]
    Connection {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Attempts made before giving up.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        source: io::Error,
    },
    /// The server closed the connection without answering.
    #[error("server at {host}:{port} closed the connection without a response")]
    ConnectionClosed {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// The request could not be encoded.
    #[error("failed to serialise command request: {0}")]
    Serialize(#[source] serde_json::Error),
    /// Writing the request failed.
    #[error("failed to send request: {0}")]
    Send(#[source] io::Error),
    /// Reading the response failed.
    #[error("failed to read response: {0}")]
    Receive(#[source] io::Error),
    /// The response was not a valid envelope.
    #[error("protocol error: {message}")]
    Protocol {
        /// Parser or shape diagnostic.
        message: String,
    },
    /// The response exceeded the configured limit.
    #[error("response too large: {size} bytes exceeds {max_size} byte limit")]
    ResponseTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Configured limit.
        max_size: usize,
    },
    /// The server answered with an error envelope.
    #[error("server reported an error: {message}")]
    Remote {
        /// Message carried by the envelope.
        message: String,
    },
}

impl ClientError {
    /// Returns `true` when the failure means no server is listening.
    #[must_use]
    pub fn is_server_not_running(&self) -> bool {
        match self {
            Self::Connection { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::NotFound
                    | io::ErrorKind::AddrNotAvailable
            ),
            _ => false,
        }
    }
}

impl From<FrameError> for ClientError {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::TooLarge { size, max_size } => Self::ResponseTooLarge { size, max_size },
            FrameError::Malformed { message, .. } => Self::Protocol { message },
        }
    }
}

impl From<ResponseError> for ClientError {
    fn from(error: ResponseError) -> Self {
        Self::Protocol {
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] unreal_mcp_config::ConfigError),
    #[error("--params must be a JSON object: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to write output: {0}")]
    WriteOutput(#[from] io::Error),
    #[error("failed to encode response: {0}")]
    EncodeResponse(#[from] serde_json::Error),
}
