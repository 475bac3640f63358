//! TCP command server for the Unreal MCP bridge.
//!
//! The server accepts JSON command requests on a single TCP port, resolves
//! each one through a [`CommandRegistry`], and answers with a JSON envelope
//! on the same connection. One connection carries exactly one request and
//! one response.
//!
//! Accepted connections are handed to a fixed-size worker pool through a
//! bounded queue, so a flood of clients waits in the queue rather than
//! spawning unbounded threads. [`Server::stop`] closes live connections,
//! drains the pool, and removes the PID file written at startup.
//!
//! The [`run_server`] entry point wires configuration, structured
//! telemetry, the builtin commands, and signal handling around the server
//! for the `unreal-mcpd` binary.

mod bootstrap;
mod commands;
pub mod dispatch;
mod health;
mod process;
mod registry;
mod server;
pub mod telemetry;
mod transport;

pub use bootstrap::{ConfigLoader, StaticConfigLoader, SystemConfigLoader};
pub use commands::{ENGINE_COMMANDS, register_builtin_commands};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, LaunchPlan, PidFile, PidFileError, ShutdownError, ShutdownSignal,
    SystemShutdownSignal, run_server, run_server_with,
};
pub use registry::{CommandHandler, CommandRegistry, HandlerError, RegistryError};
pub use server::{Server, ServerError, ServerSettings, ServerState};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;
