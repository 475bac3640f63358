//! Error types for frame decoding and envelope validation.

use thiserror::Error;

/// Errors raised while accumulating or decoding a JSON frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The accumulated bytes exceed the configured frame limit.
    #[error("frame too large: {size} bytes exceeds {max_size} byte limit")]
    TooLarge {
        /// Number of bytes buffered so far.
        size: usize,
        /// Configured upper bound.
        max_size: usize,
    },
    /// The bytes can never become valid JSON, whatever follows them.
    #[error("malformed JSON: {message}")]
    Malformed {
        /// Human-readable parser diagnostic.
        message: String,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },
}

impl FrameError {
    pub(crate) fn malformed(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source,
        }
    }
}

/// Errors raised when a decoded value is not a valid command request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The top-level JSON value was not an object.
    #[error("request must be a JSON object, received {kind}")]
    NotAnObject {
        /// JSON kind that was received instead.
        kind: &'static str,
    },
    /// The object did not match the request schema.
    #[error("invalid request structure: {source}")]
    InvalidStructure {
        /// Underlying schema error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised when a decoded value is not a recognisable response.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The bytes could not be parsed as JSON at all.
    #[error("malformed response: {source}")]
    Malformed {
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The top-level JSON value was not an object.
    #[error("response must be a JSON object, received {kind}")]
    NotAnObject {
        /// JSON kind that was received instead.
        kind: &'static str,
    },
    /// The object carried an unknown `status` value.
    #[error("unexpected response status '{status}'")]
    UnknownStatus {
        /// Status value that was received.
        status: String,
    },
    /// The object carried neither a `status` nor an `error` field.
    #[error("response carries neither a status nor an error field")]
    UnexpectedShape,
    /// A successful response carried a non-object `result`.
    #[error("response result must be a JSON object, received {kind}")]
    ResultNotAnObject {
        /// JSON kind that was received instead.
        kind: &'static str,
    },
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
