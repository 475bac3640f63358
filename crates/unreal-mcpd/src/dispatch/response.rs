//! Response serialisation for the dispatch loop.

use std::io::Write;

use unreal_mcp_types::CommandResponse;

use super::errors::DispatchError;

/// Writer that serialises response envelopes to a stream.
///
/// Each envelope is written as one newline-terminated JSON document and
/// flushed immediately; the connection carries nothing else afterwards.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a response envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub fn write_response(&mut self, response: &CommandResponse) -> Result<(), DispatchError> {
        let bytes = response.to_bytes()?;
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes the error envelope describing `error`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub fn write_error(&mut self, error: &DispatchError) -> Result<(), DispatchError> {
        self.write_response(&error.to_response())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use unreal_mcp_types::Params;

    use super::*;

    fn written(response: &CommandResponse) -> Value {
        let mut buffer = Vec::new();
        ResponseWriter::new(&mut buffer)
            .write_response(response)
            .expect("write response");
        assert_eq!(buffer.last(), Some(&b'\n'), "envelope must end the line");
        serde_json::from_slice(&buffer).expect("valid json")
    }

    #[test]
    fn success_envelope_wraps_result() {
        let mut result = Params::new();
        result.insert("echo".to_owned(), json!({ "x": 1 }));
        assert_eq!(
            written(&CommandResponse::success(result)),
            json!({ "status": "success", "result": { "echo": { "x": 1 } } })
        );
    }

    #[test]
    fn error_envelope_uses_canonical_shape() {
        let mut buffer = Vec::new();
        ResponseWriter::new(&mut buffer)
            .write_error(&DispatchError::MissingType)
            .expect("write error");
        let value: Value = serde_json::from_slice(&buffer).expect("valid json");
        assert_eq!(
            value,
            json!({ "status": "error", "error": "command is missing a 'type' field" })
        );
    }
}
