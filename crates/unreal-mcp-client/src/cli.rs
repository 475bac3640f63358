//! CLI argument definitions for the `unreal-mcp` binary.

use clap::{Parser, Subcommand};

const CONFIG_HELP: &str = "\
Configuration flags must precede the subcommand:
  --host <HOST>  --port <PORT>  --timeout-ms <MS>  --max-retries <N>
  --retry-delay-ms <MS>  --config-path <FILE>";

/// Command-line client for the command server.
#[derive(Parser, Debug)]
#[command(
    name = "unreal-mcp",
    version,
    disable_help_subcommand = true,
    after_help = CONFIG_HELP
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Sends one command and prints the response envelope.
    Send {
        /// Command type, for example `ping`.
        #[arg(value_name = "TYPE")]
        command_type: String,
        /// Parameters as a JSON object.
        #[arg(long, value_name = "JSON")]
        params: Option<String>,
    },
    /// Reports whether the server accepts connections.
    Probe,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn send_accepts_type_and_params() {
        let cli = Cli::try_parse_from(["unreal-mcp", "send", "ping", "--params", r#"{"a":1}"#])
            .expect("parse send");
        assert_eq!(
            cli.command,
            CliCommand::Send {
                command_type: "ping".to_owned(),
                params: Some(r#"{"a":1}"#.to_owned()),
            }
        );
    }

    #[rstest]
    fn send_requires_a_type() {
        assert!(Cli::try_parse_from(["unreal-mcp", "send"]).is_err());
    }

    #[rstest]
    fn probe_takes_no_arguments() {
        let cli = Cli::try_parse_from(["unreal-mcp", "probe"]).expect("parse probe");
        assert_eq!(cli.command, CliCommand::Probe);
    }
}
