//! Error types for request dispatch failures.
//!
//! Every variant maps to the message carried by the error envelope written
//! back to the client, so a failed request still yields exactly one response.

use std::io;

use thiserror::Error;
use unreal_mcp_types::{CommandResponse, FrameError, RequestError};

use crate::registry::RegistryError;

/// Errors surfaced while reading, parsing, or executing a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request carried no usable `type` field.
    #[error("command is missing a 'type' field")]
    MissingType,

    /// No handler is registered for the requested type.
    #[error("unknown command type: {command_type}")]
    UnknownCommand {
        /// Type named by the request.
        command_type: String,
    },

    /// The bytes received could not be decoded into a command request.
    #[error("protocol error: {message}")]
    Protocol {
        /// Parser or structure diagnostic.
        message: String,
    },

    /// The request grew beyond the configured frame limit.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Configured limit.
        max_size: usize,
    },

    /// The handler ran and reported a failure.
    #[error("command '{command_type}' failed: {message}")]
    Handler {
        /// Type of the failing command.
        command_type: String,
        /// Failure reported by the handler.
        message: String,
    },

    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Response serialisation failed.
    #[error("failed to serialise response: {0}")]
    SerializeResponse(#[from] serde_json::Error),
}

impl DispatchError {
    /// Creates a protocol error with a custom message.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns `true` when the peer can still be sent an error envelope.
    ///
    /// IO failures mean the socket itself is unusable.
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::Io(_))
    }

    /// Builds the error envelope describing this failure.
    #[must_use]
    pub fn to_response(&self) -> CommandResponse {
        match self {
            Self::Handler { message, .. } => CommandResponse::error(message.clone()),
            other => CommandResponse::error(other.to_string()),
        }
    }
}

impl From<RegistryError> for DispatchError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::MissingType => Self::MissingType,
            RegistryError::UnknownCommand { command_type } => Self::UnknownCommand { command_type },
            RegistryError::Handler {
                command_type,
                source,
            } => Self::Handler {
                command_type,
                message: source.message().to_owned(),
            },
        }
    }
}

impl From<FrameError> for DispatchError {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::TooLarge { size, max_size } => Self::RequestTooLarge { size, max_size },
            FrameError::Malformed { message, .. } => Self::Protocol { message },
        }
    }
}

impl From<RequestError> for DispatchError {
    fn from(error: RequestError) -> Self {
        Self::protocol(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use unreal_mcp_types::ResponseStatus;

    use super::*;
    use crate::registry::HandlerError;

    #[rstest]
    fn handler_failures_report_the_handler_message() {
        let error = DispatchError::from(RegistryError::Handler {
            command_type: "create_actor".to_owned(),
            source: HandlerError::new("actor name already in use"),
        });
        let response = error.to_response();
        assert_eq!(response.status(), ResponseStatus::Error);
        assert_eq!(
            response.into_result(),
            Err("actor name already in use".to_owned())
        );
    }

    #[rstest]
    #[case::missing(RegistryError::MissingType, "command is missing a 'type' field")]
    #[case::unknown(
        RegistryError::UnknownCommand { command_type: "warp".to_owned() },
        "unknown command type: warp"
    )]
    fn registry_failures_map_to_envelope_messages(
        #[case] error: RegistryError,
        #[case] expected: &str,
    ) {
        let response = DispatchError::from(error).to_response();
        assert_eq!(response.into_result(), Err(expected.to_owned()));
    }

    #[rstest]
    fn oversized_frames_map_to_request_too_large() {
        let error = DispatchError::from(FrameError::TooLarge {
            size: 20,
            max_size: 10,
        });
        assert!(matches!(
            error,
            DispatchError::RequestTooLarge {
                size: 20,
                max_size: 10
            }
        ));
        assert!(error.is_reportable());
    }

    #[rstest]
    fn io_failures_are_not_reportable() {
        let error = DispatchError::from(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(!error.is_reportable());
    }
}
