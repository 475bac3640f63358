//! Integration tests for the `unreal-mcp` binary entry point.
//!
//! Drives the built binary against an in-process server and against a port
//! with nothing listening.

use std::net::TcpListener;

use anyhow::Result;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use serde_json::Value;
use unreal_mcp_client::Params;
use unreal_mcpd::{
    CommandRegistry, HandlerError, Server, ServerSettings, register_builtin_commands,
};

fn closed_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn echo(params: Params) -> Result<Params, HandlerError> {
    let mut result = Params::new();
    result.insert("echo".to_owned(), Value::Object(params));
    Ok(result)
}

fn start_server() -> Result<(Server, u16)> {
    let server = Server::new(
        ServerSettings {
            port: 0,
            pid_file: None,
            ..ServerSettings::default()
        },
        CommandRegistry::new(),
    );
    register_builtin_commands(server.registry());
    server.register_command("echo", echo);
    let addr = server.start()?;
    Ok((server, addr.port()))
}

#[test]
fn send_echo_round_trips_through_the_binary() -> Result<()> {
    let (server, port) = start_server()?;

    let mut command = cargo_bin_cmd!("unreal-mcp");
    command.args(["--port", &port.to_string(), "send", "echo", "--params", r#"{"x":1}"#]);
    command
        .assert()
        .success()
        .stdout(contains(r#"{"status":"success","result":{"echo":{"x":1}}}"#));

    server.stop()?;
    Ok(())
}

#[test]
fn builtin_ping_reports_pong() -> Result<()> {
    let (server, port) = start_server()?;

    let mut command = cargo_bin_cmd!("unreal-mcp");
    command.args([format!("--port={port}").as_str(), "send", "ping"]);
    command.assert().success().stdout(contains(r#""pong":true"#));

    server.stop()?;
    Ok(())
}

#[test]
fn engine_command_without_bridge_fails() -> Result<()> {
    let (server, port) = start_server()?;

    let mut command = cargo_bin_cmd!("unreal-mcp");
    command.args(["--port", &port.to_string(), "send", "create_actor"]);
    command
        .assert()
        .failure()
        .stdout(contains("no engine bridge is attached"));

    server.stop()?;
    Ok(())
}

#[test]
fn probe_against_closed_port_reports_not_running() -> Result<()> {
    let port = closed_port()?;

    let mut command = cargo_bin_cmd!("unreal-mcp");
    command.args(["--port", &port.to_string(), "probe"]);
    command.assert().failure().stdout(contains("not running"));
    Ok(())
}

#[test]
fn send_to_closed_port_fails_after_retries() -> Result<()> {
    let port = closed_port()?;

    let mut command = cargo_bin_cmd!("unreal-mcp");
    command.args([
        "--port",
        &port.to_string(),
        "--max-retries",
        "2",
        "--retry-delay-ms",
        "10",
        "send",
        "ping",
    ]);
    command
        .assert()
        .failure()
        .stderr(contains("failed to connect"));
    Ok(())
}

#[test]
fn missing_command_type_is_a_usage_error() {
    let mut command = cargo_bin_cmd!("unreal-mcp");
    command.arg("send");
    command.assert().failure().stderr(contains("TYPE"));
}
