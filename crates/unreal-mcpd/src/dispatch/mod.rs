//! Request dispatch for accepted connections.
//!
//! The dispatch layer turns the raw byte stream of one connection into a
//! command request, resolves it through the [`CommandRegistry`], and writes
//! the response envelope back on the same connection.
//!
//! [`CommandRegistry`]: crate::registry::CommandRegistry

mod errors;
mod handler;
mod response;

pub use self::errors::DispatchError;
pub use self::handler::{DispatchConnectionHandler, ReadLimits};
pub use self::response::ResponseWriter;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
