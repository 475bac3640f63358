use camino::Utf8PathBuf;

/// Default interface the server binds to and the client connects to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default TCP port for the command server.
pub const DEFAULT_PORT: u16 = 55557;

/// Default size of the connection worker pool.
pub const DEFAULT_MAX_CONNECTIONS: usize = 5;

/// Default size of each socket read.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Default socket timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default upper bound on a single request or response frame.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Default PID file consulted by external lifecycle tooling.
pub const DEFAULT_PID_FILE: &str = "unreal_mcp.pid";

/// Default number of client connection attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause between client connection attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default PID file location, relative to the working directory.
#[must_use]
pub fn default_pid_file() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_PID_FILE)
}

/// Default `host:port` address string.
#[must_use]
pub fn default_address() -> String {
    format!("{DEFAULT_HOST}:{DEFAULT_PORT}")
}
