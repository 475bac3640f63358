//! Defines the error surface for server launch and supervision.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use nix::errno::Errno;
use ortho_config::OrthoError;
use thiserror::Error;
use unreal_mcp_config::ConfigError;

use crate::server::ServerError;
use crate::telemetry::TelemetryError;

use super::shutdown::ShutdownError;

/// Errors raised while managing the PID file.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// The PID file names a process that is still alive.
    #[error("server already running with pid {pid}")]
    AlreadyRunning {
        /// PID recorded in the existing file.
        pid: u32,
    },
    /// Writing the PID file failed.
    #[error("failed to write pid file '{path}': {source}")]
    Write {
        /// PID file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Probing the recorded PID failed.
    #[error("failed to check existing process {pid}: {source}")]
    CheckProcess {
        /// PID that failed to probe.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}

/// Errors surfaced while launching or supervising the server process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// The loaded configuration is unusable.
    #[error("invalid configuration: {source}")]
    InvalidConfig {
        /// Validation failure.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The server failed to start or stop.
    #[error("command server failed: {source}")]
    Server {
        /// Underlying server error.
        #[source]
        source: ServerError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
}

impl From<Arc<OrthoError>> for LaunchError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Config { source }
    }
}

impl From<ConfigError> for LaunchError {
    fn from(source: ConfigError) -> Self {
        Self::InvalidConfig { source }
    }
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<ServerError> for LaunchError {
    fn from(source: ServerError) -> Self {
        Self::Server { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
