//! Shared configuration for the Unreal MCP command server and its client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! TOML file selected with `--config-path` (or `MCP_CONFIG_PATH`), then
//! `MCP_*` environment variables, and finally command-line flags. Both
//! binaries read the same structure so that a single file can describe the
//! server and the tooling that talks to it.

mod defaults;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_BUFFER_SIZE, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MAX_REQUEST_BYTES, DEFAULT_MAX_RETRIES, DEFAULT_PID_FILE, DEFAULT_PORT,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS, default_address, default_log_filter,
    default_log_format, default_pid_file,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration shared by the server daemon and the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "MCP")]
#[serde(default)]
pub struct Config {
    /// Interface the server binds to and the client connects to.
    #[ortho_config(cli_short = 'H')]
    pub host: String,
    /// TCP port of the command server.
    pub port: u16,
    /// Number of connection workers, and therefore of concurrently served
    /// connections.
    pub max_connections: usize,
    /// Size of each socket read.
    pub buffer_size: usize,
    /// Socket timeout applied to reads, writes, and client connects.
    pub timeout_ms: u64,
    /// Upper bound on a single request or response frame.
    pub max_request_bytes: usize,
    /// PID file written while the server is running.
    pub pid_file: Utf8PathBuf,
    /// Total number of client connection attempts.
    pub max_retries: u32,
    /// Pause between client connection attempts.
    pub retry_delay_ms: u64,
    /// Tracing filter expression applied to log output.
    pub log_filter: String,
    /// Output format used for log records.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            pid_file: default_pid_file(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Returns the configured host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the configured port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the `host:port` pair used to bind or connect.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the worker pool size.
    #[must_use]
    pub const fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Returns the socket read size.
    #[must_use]
    pub const fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Returns the socket timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the frame size limit.
    #[must_use]
    pub const fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    /// Returns the PID file location.
    #[must_use]
    pub fn pid_file(&self) -> &Utf8Path {
        self.pid_file.as_path()
    }

    /// Returns the number of client connection attempts.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the pause between client connection attempts.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Checks the values that would otherwise stall the server or the client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the host is blank or when a size, count,
    /// or timeout that must be positive is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        let positive = [
            ("max_connections", self.max_connections == 0),
            ("buffer_size", self.buffer_size == 0),
            ("timeout_ms", self.timeout_ms == 0),
            ("max_request_bytes", self.max_request_bytes == 0),
            ("max_retries", self.max_retries == 0),
        ];
        match positive.into_iter().find(|(_, is_zero)| *is_zero) {
            Some((field, _)) => Err(ConfigError::MustBePositive { field }),
            None => Ok(()),
        }
    }
}

/// Errors raised when a loaded configuration cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The host was empty or whitespace.
    #[error("host must not be empty")]
    EmptyHost,
    /// A field that must be greater than zero was zero.
    #[error("{field} must be greater than zero")]
    MustBePositive {
        /// Name of the offending field.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(config.port(), 55557);
        assert_eq!(config.max_connections(), 5);
        assert_eq!(config.buffer_size(), 4096);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.max_retries(), 3);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
        assert_eq!(config.pid_file(), Utf8Path::new("unreal_mcp.pid"));
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.address(), default_address());
    }

    #[test]
    fn defaults_validate() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[rstest]
    #[case::max_connections(Config { max_connections: 0, ..Config::default() }, "max_connections")]
    #[case::buffer_size(Config { buffer_size: 0, ..Config::default() }, "buffer_size")]
    #[case::timeout(Config { timeout_ms: 0, ..Config::default() }, "timeout_ms")]
    #[case::frame_limit(Config { max_request_bytes: 0, ..Config::default() }, "max_request_bytes")]
    #[case::retries(Config { max_retries: 0, ..Config::default() }, "max_retries")]
    fn zero_values_are_rejected(#[case] config: Config, #[case] field: &str) {
        match config.validate() {
            Err(ConfigError::MustBePositive { field: reported }) => assert_eq!(reported, field),
            other => panic!("expected {field} to be rejected, got {other:?}"),
        }
    }

    #[test]
    fn blank_host_is_rejected() {
        let config = Config {
            host: "  ".to_owned(),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyHost));
    }

    #[test]
    fn port_zero_is_allowed_for_ephemeral_binding() {
        let config = Config {
            port: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.address(), "127.0.0.1:0");
    }
}
