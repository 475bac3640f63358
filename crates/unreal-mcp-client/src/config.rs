//! Configuration loading helpers for the client CLI.
//!
//! Configuration flags lead the argument list and are handed to
//! `ortho-config`; everything from the first unrecognised token onwards is
//! parsed by clap as the subcommand.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use unreal_mcp_config::Config;

use crate::errors::AppError;

/// CLI flags recognised by the configuration loader.
///
/// Must stay in sync with the fields of [`Config`] that the client reads.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--host",
    "--port",
    "--timeout-ms",
    "--max-retries",
    "--retry-delay-ms",
    "--max-request-bytes",
    "--log-filter",
    "--log-format",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the leading configuration flags.
    ///
    /// Configuration flags appearing after the subcommand are not seen here.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify_flag(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Stop;
    }
    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

#[derive(Debug)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

/// Separates leading configuration flags from the subcommand tokens.
///
/// The program name is copied into the configuration arguments so that the
/// loader sees a conventional argv.
pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some(program) = args.first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut index = 1;
    while index < args.len() {
        match classify_flag(&args[index]) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(args[index].clone());
                index += 1;
                if needs_value && let Some(value) = args.get(index) {
                    config_arguments.push(value.clone());
                    index += 1;
                }
            }
            FlagAction::Stop => break,
        }
    }

    ConfigArgumentSplit {
        config_arguments,
        command_start: index,
    }
}

/// Rebuilds the argv clap parses: the program name plus the command tokens.
pub(crate) fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.get(split.command_start..).unwrap_or_default())
        .cloned()
        .collect()
}
