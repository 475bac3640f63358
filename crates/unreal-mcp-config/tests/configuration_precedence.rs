use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use unreal_mcp_config::{Config, LogFormat};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const MANAGED_KEYS: &[&str] = &[
    "MCP_CONFIG_PATH",
    "MCP_HOST",
    "MCP_PORT",
    "MCP_MAX_CONNECTIONS",
    "MCP_LOG_FORMAT",
];

/// Serialises environment access and restores the managed keys on drop.
struct Harness {
    temp_dir: TempDir,
    args: Vec<OsString>,
    previous: Vec<(&'static str, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn write_config(&mut self, contents: &str) {
        let path = self.temp_dir.path().join("mcp.toml");
        fs::write(&path, contents).expect("write configuration file");
        self.args.push(OsString::from("--config-path"));
        self.args.push(path.into_os_string());
    }

    fn set_env(&mut self, key: &'static str, value: &str) {
        // Environment mutation is unsafe under edition 2024; the mutex keeps
        // these tests from racing each other.
        unsafe { std::env::set_var(key, value) };
    }

    fn push_args(&mut self, args: &[&str]) {
        self.args.extend(args.iter().map(OsString::from));
    }

    fn load(&self) -> Config {
        Config::load_from_iter(self.args.clone()).expect("configuration should load")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        for (key, previous) in self.previous.drain(..) {
            match previous {
                Some(value) => unsafe { std::env::set_var(key, value) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

#[fixture]
fn harness() -> Harness {
    let guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let previous = MANAGED_KEYS
        .iter()
        .map(|key| (*key, std::env::var_os(key)))
        .collect();
    for key in MANAGED_KEYS {
        unsafe { std::env::remove_var(key) };
    }
    Harness {
        temp_dir: TempDir::new().expect("create temp dir"),
        args: vec![OsString::from("unreal-mcpd")],
        previous,
        _guard: guard,
    }
}

#[rstest]
fn defaults_apply_without_overrides(harness: Harness) {
    let config = harness.load();
    assert_eq!(config, Config::default());
}

#[rstest]
fn file_values_override_defaults(mut harness: Harness) {
    harness.write_config("port = 6001\nmax_connections = 9\nlog_format = \"compact\"\n");
    let config = harness.load();
    assert_eq!(config.port(), 6001);
    assert_eq!(config.max_connections(), 9);
    assert_eq!(config.log_format(), LogFormat::Compact);
    assert_eq!(config.host(), "127.0.0.1");
}

#[rstest]
fn environment_overrides_file(mut harness: Harness) {
    harness.write_config("port = 6001\n");
    harness.set_env("MCP_PORT", "6002");
    let config = harness.load();
    assert_eq!(config.port(), 6002);
}

#[rstest]
fn cli_overrides_environment(mut harness: Harness) {
    harness.set_env("MCP_PORT", "6002");
    harness.push_args(&["--port", "6003"]);
    let config = harness.load();
    assert_eq!(config.port(), 6003);
}

#[rstest]
fn malformed_file_is_reported(mut harness: Harness) {
    harness.write_config("port = \"not a number\"\n");
    let result = Config::load_from_iter(harness.args.clone());
    assert!(result.is_err(), "malformed configuration must not load");
}
