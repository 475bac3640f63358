//! Command registry mapping command types to handlers.
//!
//! The registry is the single synchronous entry point used by the dispatch
//! path. It is constructed explicitly and shared with the server through an
//! [`Arc`], so handlers can be added or replaced from any thread while
//! connections are being served.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::{debug, warn};
use unreal_mcp_types::{CommandRequest, Params};

/// Tracing target for registry operations.
pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Failure reported by a command handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Builds a handler error carrying a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Business logic bound to a single command type.
///
/// Handlers run synchronously on a worker thread and may be invoked from
/// several workers at once.
pub trait CommandHandler: Send + Sync {
    /// Executes the command with its parameter bag.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the command cannot be completed.
    fn handle(&self, params: Params) -> Result<Params, HandlerError>;
}

impl<F> CommandHandler for F
where
    F: Fn(Params) -> Result<Params, HandlerError> + Send + Sync,
{
    fn handle(&self, params: Params) -> Result<Params, HandlerError> {
        self(params)
    }
}

/// Errors surfaced while resolving or executing a command.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The request carried no usable `type` field.
    #[error("command is missing a 'type' field")]
    MissingType,
    /// No handler is registered for the requested type.
    #[error("unknown command type: {command_type}")]
    UnknownCommand {
        /// Type named by the request.
        command_type: String,
    },
    /// The handler ran and reported a failure.
    #[error("command '{command_type}' failed: {source}")]
    Handler {
        /// Type of the failing command.
        command_type: String,
        /// Failure reported by the handler.
        #[source]
        source: HandlerError,
    },
}

impl RegistryError {
    fn unknown(command_type: &str) -> Self {
        Self::UnknownCommand {
            command_type: command_type.to_owned(),
        }
    }
}

/// Thread-safe lookup table from command type to handler.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `command_type`, replacing any existing entry.
    ///
    /// Replacement is logged as a warning rather than treated as an error.
    pub fn register<H>(&self, command_type: impl Into<String>, handler: H)
    where
        H: CommandHandler + 'static,
    {
        let command_type = command_type.into();
        let previous = self
            .write()
            .insert(command_type.clone(), Arc::new(handler));
        if previous.is_some() {
            warn!(
                target: REGISTRY_TARGET,
                command_type = %command_type,
                "replaced existing command handler"
            );
        } else {
            debug!(
                target: REGISTRY_TARGET,
                command_type = %command_type,
                "registered command handler"
            );
        }
    }

    /// Removes the handler for `command_type`.
    ///
    /// Returns `true` when a handler was removed; absent types are a no-op.
    pub fn unregister(&self, command_type: &str) -> bool {
        let removed = self.write().remove(command_type).is_some();
        if removed {
            debug!(
                target: REGISTRY_TARGET,
                command_type,
                "unregistered command handler"
            );
        }
        removed
    }

    /// Looks up the handler for `command_type`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownCommand`] when no handler is registered.
    pub fn get_handler(&self, command_type: &str) -> Result<Arc<dyn CommandHandler>, RegistryError> {
        self.read()
            .get(command_type)
            .cloned()
            .ok_or_else(|| RegistryError::unknown(command_type))
    }

    /// Returns `true` when a handler is registered for `command_type`.
    #[must_use]
    pub fn has_handler(&self, command_type: &str) -> bool {
        self.read().contains_key(command_type)
    }

    /// Returns the registered command types in sorted order.
    #[must_use]
    pub fn list_commands(&self) -> Vec<String> {
        let mut commands: Vec<String> = self.read().keys().cloned().collect();
        commands.sort_unstable();
        commands
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` when no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Resolves and runs the handler named by `request`.
    ///
    /// The type is checked before lookup, so a request without one never
    /// reaches a handler. A handler that panics is reported as a
    /// [`RegistryError::Handler`] failure instead of unwinding into the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MissingType`], [`RegistryError::UnknownCommand`],
    /// or [`RegistryError::Handler`].
    pub fn execute(&self, request: CommandRequest) -> Result<Params, RegistryError> {
        let command_type = request
            .command_type()
            .ok_or(RegistryError::MissingType)?
            .to_owned();
        // The read guard is released before the handler runs so handlers may
        // register further commands.
        let handler = self.get_handler(&command_type)?;
        debug!(
            target: REGISTRY_TARGET,
            command_type = %command_type,
            "executing command"
        );
        let params = request.params;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(params)))
            .unwrap_or_else(|payload| {
                Err(HandlerError::new(format!(
                    "handler panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });
        outcome.map_err(|source| RegistryError::Handler {
            command_type,
            source,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn CommandHandler>>> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn CommandHandler>>> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.list_commands())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
