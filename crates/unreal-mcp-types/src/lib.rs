//! Wire protocol shared by the command server and its clients.
//!
//! A request is a single JSON object `{"type": ..., "params": {...}}` and a
//! response is a single JSON object carrying a `status` discriminator. The
//! stream carries no length prefix: the receiver accumulates bytes and treats
//! the first point at which they decode as a complete JSON value as the end of
//! the message. [`FrameDecoder`] implements that policy for both peers.
//!
//! One physical connection carries exactly one request/response cycle, so
//! peers must never pipeline two messages on the same socket.

mod errors;
mod frame;
mod request;
mod response;

pub use errors::{FrameError, RequestError, ResponseError};
pub use frame::{DEFAULT_MAX_FRAME_BYTES, FrameDecoder};
pub use request::CommandRequest;
pub use response::{CommandResponse, ResponseStatus};

/// Open, handler-defined bag of JSON values used for parameters and results.
pub type Params = serde_json::Map<String, serde_json::Value>;
