//! TCP transport for the command server.
//!
//! The listener binds the configured address with address reuse enabled and
//! accepts connections on a background thread. Accepted streams are tracked
//! so shutdown can close them, then queued to a fixed pool of workers that
//! run the [`ConnectionHandler`].

mod errors;
mod handler;
mod listener;
mod pool;
#[cfg(test)]
mod test_utils;
mod tracker;

pub use self::errors::ListenerError;
pub(crate) use self::handler::ConnectionHandler;
pub(crate) use self::listener::{ListenerHandle, ListenerOptions, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;
pub(crate) use self::tracker::ConnectionTracker;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
