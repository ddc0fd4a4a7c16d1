mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, ConnectionArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "rconlink", version, about = "Remote-console tool bridge CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr). RCONLINK_LOG overrides it.
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.connection, format).await;

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_subcommand() {
        let cli = Cli::try_parse_from([
            "rconlink",
            "call",
            "move_to",
            "--args",
            r#"{"companionId":1,"x":10,"y":20}"#,
        ])
        .expect("call args should parse");

        match cli.command {
            Command::Call(args) => {
                assert_eq!(args.name, "move_to");
                assert!(!args.wait);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn connection_flags_are_global() {
        let cli = Cli::try_parse_from([
            "rconlink",
            "send",
            "/fac_version",
            "--host",
            "10.0.0.2",
            "--port",
            "27015",
            "--password",
            "hunter2",
        ])
        .expect("send args should parse");

        assert!(matches!(cli.command, Command::Send(_)));
        assert_eq!(cli.connection.host, "10.0.0.2");
        assert_eq!(cli.connection.port, "27015");
        assert_eq!(cli.connection.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn rejects_unknown_tool_kind() {
        let err = Cli::try_parse_from(["rconlink", "tools", "--kind", "gadget"])
            .expect_err("unknown kind should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn parses_serve_subcommand() {
        let cli = Cli::try_parse_from(["rconlink", "--log-format", "json", "serve", "--lazy"])
            .expect("serve args should parse");
        assert!(matches!(cli.command, Command::Serve(ref args) if args.lazy));
    }
}
