//! Response envelope and client-side normalisation.
//!
//! The server always emits the canonical envelope:
//!
//! ```json
//! {"status":"success","result":{"echo":{"x":1}}}
//! {"status":"error","error":"unknown command: bogus"}
//! ```
//!
//! Older peers also produced `{"status":"error","message":...}`, a bare
//! `{"error":...}` object, and success objects that inline their fields next
//! to `status` instead of nesting them under `result`. [`CommandResponse::from_value`]
//! folds all of these into the canonical form so callers handle one shape.

use serde::Serialize;
use serde_json::Value;

use crate::Params;
use crate::errors::{ResponseError, json_kind};

const FALLBACK_ERROR: &str = "unspecified error";

/// Outcome discriminator carried in the `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// The handler completed and produced a result.
    Success,
    /// The request failed; the envelope carries a message.
    Error,
}

/// Canonical response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandResponse {
    /// Successful execution with the handler's result bag.
    Success {
        /// Result returned by the handler, unchanged.
        result: Params,
    },
    /// Failed execution with a human-readable message.
    Error {
        /// Description of the failure.
        error: String,
    },
}

impl CommandResponse {
    /// Builds a success envelope.
    #[must_use]
    pub const fn success(result: Params) -> Self {
        Self::Success { result }
    }

    /// Builds an error envelope.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Returns the status discriminator.
    #[must_use]
    pub const fn status(&self) -> ResponseStatus {
        match self {
            Self::Success { .. } => ResponseStatus::Success,
            Self::Error { .. } => ResponseStatus::Error,
        }
    }

    /// Returns `true` for success envelopes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Converts the envelope into a `Result` over the result bag.
    ///
    /// # Errors
    ///
    /// Returns the carried message for error envelopes.
    pub fn into_result(self) -> Result<Params, String> {
        match self {
            Self::Success { result } => Ok(result),
            Self::Error { error } => Err(error),
        }
    }

    /// Serialises the envelope as a newline-terminated JSON document.
    ///
    /// # Errors
    ///
    /// Returns the serialisation error when a result value cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parses raw bytes into a normalised envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::Malformed`] for invalid JSON and the errors of
    /// [`CommandResponse::from_value`] for unexpected shapes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ResponseError> {
        let value =
            serde_json::from_slice(bytes).map_err(|source| ResponseError::Malformed { source })?;
        Self::from_value(value)
    }

    /// Normalises a decoded JSON value into the canonical envelope.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is not an object, carries an unknown
    /// status, carries neither `status` nor `error`, or carries a non-object
    /// `result`.
    pub fn from_value(value: Value) -> Result<Self, ResponseError> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(ResponseError::NotAnObject {
                    kind: json_kind(&other),
                });
            }
        };

        match fields.remove("status") {
            Some(Value::String(status)) => match status.as_str() {
                "success" => success_from_fields(fields),
                "error" => Ok(Self::error(error_message(&fields))),
                _ => Err(ResponseError::UnknownStatus { status }),
            },
            Some(other) => Err(ResponseError::UnknownStatus {
                status: other.to_string(),
            }),
            None if fields.contains_key("error") => Ok(Self::error(error_message(&fields))),
            None => Err(ResponseError::UnexpectedShape),
        }
    }
}

fn success_from_fields(mut fields: Params) -> Result<CommandResponse, ResponseError> {
    match fields.remove("result") {
        Some(Value::Object(result)) => Ok(CommandResponse::success(result)),
        Some(other) => Err(ResponseError::ResultNotAnObject {
            kind: json_kind(&other),
        }),
        None => Ok(CommandResponse::success(fields)),
    }
}

fn error_message(fields: &Params) -> String {
    ["error", "message"]
        .iter()
        .find_map(|key| match fields.get(*key) {
            Some(Value::String(text)) => Some(text.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .unwrap_or_else(|| FALLBACK_ERROR.to_owned())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn serialises_canonical_success() {
        let response = CommandResponse::success(params(json!({"echo": {"x": 1}})));
        let encoded = serde_json::to_value(&response).expect("encode");
        assert_eq!(
            encoded,
            json!({"status": "success", "result": {"echo": {"x": 1}}})
        );
    }

    #[test]
    fn serialises_canonical_error() {
        let encoded = serde_json::to_value(CommandResponse::error("boom")).expect("encode");
        assert_eq!(encoded, json!({"status": "error", "error": "boom"}));
    }

    #[rstest]
    #[case::canonical(json!({"status": "error", "error": "boom"}))]
    #[case::message_field(json!({"status": "error", "message": "boom"}))]
    #[case::bare_error(json!({"error": "boom"}))]
    fn normalises_error_shapes(#[case] value: Value) {
        let response = CommandResponse::from_value(value).expect("normalise");
        assert_eq!(response, CommandResponse::error("boom"));
        assert_eq!(response.status(), ResponseStatus::Error);
    }

    #[test]
    fn error_without_message_uses_fallback() {
        let response = CommandResponse::from_value(json!({"status": "error"})).expect("normalise");
        assert_eq!(response, CommandResponse::error(FALLBACK_ERROR));
    }

    #[test]
    fn inline_success_fields_become_result() {
        let response = CommandResponse::from_value(json!({"status": "success", "actors": []}))
            .expect("normalise");
        assert_eq!(
            response,
            CommandResponse::success(params(json!({"actors": []})))
        );
    }

    #[rstest]
    #[case::not_object(json!([1, 2]))]
    #[case::unknown_status(json!({"status": "pending"}))]
    #[case::no_status(json!({"result": {}}))]
    #[case::scalar_result(json!({"status": "success", "result": 3}))]
    fn rejects_unexpected_shapes(#[case] value: Value) {
        assert!(CommandResponse::from_value(value).is_err());
    }

    #[test]
    fn from_slice_reports_malformed_json() {
        let error = CommandResponse::from_slice(b"{\"status\":").expect_err("truncated");
        assert!(matches!(error, ResponseError::Malformed { .. }));
    }

    #[test]
    fn into_result_splits_outcomes() {
        let ok = CommandResponse::success(Params::new()).into_result();
        assert_eq!(ok, Ok(Params::new()));
        let err = CommandResponse::error("nope").into_result();
        assert_eq!(err, Err("nope".to_owned()));
    }
}
