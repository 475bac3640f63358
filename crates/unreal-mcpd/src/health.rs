//! Structured health reporting for server lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use unreal_mcp_config::Config;

use crate::process::LaunchError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked once configuration has loaded and validated.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when launch fails at any stage.
    fn launch_failed(&self, error: &LaunchError);

    /// Invoked once the server accepts connections.
    fn server_ready(&self, addr: SocketAddr, commands: usize);

    /// Invoked when a shutdown request has been received.
    fn server_stopping(&self);

    /// Invoked after the server has released its resources.
    fn server_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn launch_failed(&self, error: &LaunchError) {
        (**self).launch_failed(error);
    }

    fn server_ready(&self, addr: SocketAddr, commands: usize) {
        (**self).server_ready(addr, commands);
    }

    fn server_stopping(&self) {
        (**self).server_stopping();
    }

    fn server_stopped(&self) {
        (**self).server_stopped();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            address = %config.address(),
            max_connections = config.max_connections(),
            pid_file = %config.pid_file(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "server bootstrap completed"
        );
    }

    fn launch_failed(&self, error: &LaunchError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "launch_failed",
            error = %error,
            "server launch failed"
        );
    }

    fn server_ready(&self, addr: SocketAddr, commands: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_ready",
            %addr,
            commands,
            "server ready"
        );
    }

    fn server_stopping(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopping",
            "server stopping"
        );
    }

    fn server_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopped",
            "server stopped"
        );
    }
}
