//! Client for the command server.
//!
//! [`Client`] sends one [`CommandRequest`] per connection and retries refused
//! or timed-out attempts according to [`ClientSettings`]. [`run`] drives the
//! `unreal-mcp` binary on top of it; configuration flags given before the
//! subcommand are resolved through `ortho-config` together with the
//! configuration file and `MCP_*` environment variables.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;
use unreal_mcp_config::Config;

mod cli;
mod client;
mod config;
mod errors;
mod transport;

pub use client::{Client, ClientSettings, send_command};
pub use errors::ClientError;
pub use unreal_mcp_types::{CommandRequest, CommandResponse, Params};

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, prepare_cli_arguments, split_config_arguments};
use errors::AppError;

/// Runs the CLI with the given arguments and output streams.
///
/// Returns success when the command completed with a success envelope, or
/// when `probe` found the server running.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

fn run_with_loader<I, W, E, L>(args: I, stdout: &mut W, stderr: &mut E, loader: &L) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = match Cli::try_parse_from(prepare_cli_arguments(&args, &split)) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            let _ = write!(stderr, "{}", AppError::CliUsage(error));
            return ExitCode::FAILURE;
        }
    };

    let outcome = loader
        .load(&split.config_arguments)
        .and_then(|config| {
            config.validate()?;
            Ok(config)
        })
        .and_then(|config| execute(cli.command, &config, stdout));
    match outcome {
        Ok(code) => code,
        Err(error) => {
            let _ = writeln!(stderr, "unreal-mcp: {error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write>(
    command: CliCommand,
    config: &Config,
    stdout: &mut W,
) -> Result<ExitCode, AppError> {
    let client = Client::new(ClientSettings::from_config(config));
    match command {
        CliCommand::Send {
            command_type,
            params,
        } => {
            let request = CommandRequest::new(command_type, parse_params(params.as_deref())?);
            let response = client.send(&request)?;
            writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
            Ok(exit_code(response.is_success()))
        }
        CliCommand::Probe => {
            let running = client.probe();
            writeln!(stdout, "{}", if running { "running" } else { "not running" })?;
            Ok(exit_code(running))
        }
    }
}

fn parse_params(raw: Option<&str>) -> Result<Params, AppError> {
    let Some(raw) = raw else {
        return Ok(Params::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(params)) => Ok(params),
        Ok(other) => Err(AppError::InvalidParams(format!("found {other}"))),
        Err(error) => Err(AppError::InvalidParams(error.to_string())),
    }
}

const fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
