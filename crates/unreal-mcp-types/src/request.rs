//! Command request envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Params;
use crate::errors::{RequestError, json_kind};

/// A typed request: a type tag selecting the handler plus a parameter bag.
///
/// The `type` field is optional at the schema level so that a request lacking
/// it can be rejected with a dedicated error before any handler lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Command type used to select the handler.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub command_type: Option<String>,
    /// Handler-defined parameters; defaults to an empty object.
    #[serde(default)]
    pub params: Params,
}

impl CommandRequest {
    /// Builds a request for the given command type.
    #[must_use]
    pub fn new(command_type: impl Into<String>, params: Params) -> Self {
        Self {
            command_type: Some(command_type.into()),
            params,
        }
    }

    /// Validates a decoded JSON value against the request schema.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::NotAnObject`] when the value is not an object
    /// and [`RequestError::InvalidStructure`] when `type` is not a string or
    /// `params` is not an object.
    pub fn from_value(value: Value) -> Result<Self, RequestError> {
        if !value.is_object() {
            return Err(RequestError::NotAnObject {
                kind: json_kind(&value),
            });
        }
        serde_json::from_value(value).map_err(|source| RequestError::InvalidStructure { source })
    }

    /// Returns the command type exactly as sent, treating `""` as absent.
    #[must_use]
    pub fn command_type(&self) -> Option<&str> {
        self.command_type
            .as_deref()
            .filter(|value| !value.is_empty())
    }

    /// Serialises the request as a newline-terminated JSON document.
    ///
    /// # Errors
    ///
    /// Returns the serialisation error when a parameter cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn nested_params_survive_encoding() {
        let params = object(json!({
            "name": "Torch",
            "location": [0.0, 120.5, -3],
            "flags": {"visible": true, "tags": ["light", "prop"], "owner": null},
            "depth": {"a": {"b": {"c": [1, [2, [3]]]}}}
        }));
        let request = CommandRequest::new("create_actor", params);

        let bytes = request.to_bytes().expect("encode request");
        assert_eq!(bytes.last(), Some(&b'\n'));
        let value: Value = serde_json::from_slice(&bytes).expect("decode json");
        let decoded = CommandRequest::from_value(value).expect("decode request");

        assert_eq!(decoded, request);
    }

    #[test]
    fn missing_params_default_to_empty_object() {
        let request = CommandRequest::from_value(json!({"type": "ping"})).expect("decode");
        assert_eq!(request.command_type(), Some("ping"));
        assert!(request.params.is_empty());
    }

    #[rstest]
    #[case::absent(json!({"params": {}}))]
    #[case::empty(json!({"type": "", "params": {}}))]
    fn empty_or_missing_type_reads_as_none(#[case] value: Value) {
        let request = CommandRequest::from_value(value).expect("decode");
        assert_eq!(request.command_type(), None);
    }

    #[rstest]
    #[case::padded(" spaced ")]
    #[case::whitespace("   ")]
    #[case::trailing_newline("ping\n")]
    fn command_type_is_returned_verbatim(#[case] command_type: &str) {
        let request = CommandRequest::new(command_type, Params::new());
        assert_eq!(request.command_type(), Some(command_type));
    }

    #[rstest]
    #[case::number(json!(12), "number")]
    #[case::array(json!([{"type": "ping"}]), "array")]
    #[case::string(json!("ping"), "string")]
    fn rejects_non_object_requests(#[case] value: Value, #[case] expected: &str) {
        let error = CommandRequest::from_value(value).expect_err("must reject");
        match error {
            RequestError::NotAnObject { kind } => assert_eq!(kind, expected),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[rstest]
    #[case::numeric_type(json!({"type": 5}))]
    #[case::list_params(json!({"type": "ping", "params": [1, 2]}))]
    fn rejects_mistyped_fields(#[case] value: Value) {
        let error = CommandRequest::from_value(value).expect_err("must reject");
        assert!(matches!(error, RequestError::InvalidStructure { .. }));
    }

    #[test]
    fn omits_absent_type_when_serialising() {
        let request = CommandRequest::default();
        let encoded = serde_json::to_string(&request).expect("encode");
        assert_eq!(encoded, r#"{"params":{}}"#);
    }
}
