//! Supervises the launch sequence and runtime of the server process.

use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader};
use crate::commands::register_builtin_commands;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::registry::CommandRegistry;
use crate::server::Server;
use crate::telemetry;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to launch the server runtime.
pub struct LaunchPlan<L, S> {
    /// Source of the server configuration.
    pub loader: L,
    /// Blocks until the server should stop.
    pub shutdown: S,
    /// Observer for lifecycle events.
    pub reporter: Arc<dyn HealthReporter>,
}

/// Runs the server using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when configuration, telemetry, or server startup
/// fails, or when shutdown signals cannot be installed.
pub fn run_server() -> Result<(), LaunchError> {
    run_server_with(LaunchPlan {
        loader: SystemConfigLoader,
        shutdown: SystemShutdownSignal::new(),
        reporter: Arc::new(StructuredHealthReporter::new()),
    })
}

/// Runs the server with injected collaborators.
///
/// # Errors
///
/// See [`run_server`].
pub fn run_server_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let reporter = Arc::clone(&plan.reporter);
    let result = serve(plan);
    if let Err(error) = &result {
        reporter.launch_failed(error);
    }
    result
}

fn serve<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        shutdown,
        reporter,
    } = plan;

    let config = loader.load()?;
    config.validate()?;
    telemetry::initialise(&config)?;
    reporter.bootstrap_succeeded(&config);

    let server = Server::from_config(&config, CommandRegistry::new());
    register_builtin_commands(server.registry());
    let addr = server.start()?;
    reporter.server_ready(addr, server.registry().len());

    let waited = shutdown.wait();
    reporter.server_stopping();
    server.stop()?;
    reporter.server_stopped();
    waited?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
