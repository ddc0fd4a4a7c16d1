use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use rconlink_client::{
    config::parse_port, ClientOptions, RconClient, RconConfig, ENV_HOST, ENV_PASSWORD, ENV_PORT,
};
use rconlink_transport::{DEFAULT_HOST, DEFAULT_PORT};

use crate::exit::{client_error, config_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod call;
pub mod info;
pub mod send;
pub mod serve;
pub mod tools;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve tool calls as newline-delimited JSON on stdin/stdout.
    Serve(ServeArgs),
    /// List every tool, skill and composite with its parameters.
    Tools(ToolsArgs),
    /// Invoke one tool by name.
    Call(CallArgs),
    /// Send a raw console command.
    Send(SendArgs),
    /// Connect and print server metadata.
    Info(InfoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, connection: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, connection).await,
        Command::Tools(args) => tools::run(args, format),
        Command::Call(args) => call::run(args, connection, format).await,
        Command::Send(args) => send::run(args, connection, format).await,
        Command::Info(args) => info::run(args, connection, format).await,
        Command::Version(args) => version::run(args),
    }
}

/// Server address and secret, shared by every subcommand that connects.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Server host.
    #[arg(long, env = ENV_HOST, default_value = DEFAULT_HOST, global = true)]
    pub host: String,

    /// Remote-console port (1-65535).
    #[arg(long, env = ENV_PORT, default_value_t = DEFAULT_PORT.to_string(), global = true)]
    pub port: String,

    /// Remote-console password.
    #[arg(long, env = ENV_PASSWORD, hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Connect and authentication deadline (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    pub connect_timeout: String,
}

impl ConnectionArgs {
    pub fn config(&self) -> CliResult<RconConfig> {
        let port = parse_port(&self.port).map_err(|err| config_error("invalid configuration", err))?;
        let config = RconConfig::new(
            self.host.clone(),
            port,
            self.password.clone().unwrap_or_default(),
        );
        config
            .validate()
            .map_err(|err| config_error("invalid configuration", err))?;
        Ok(config)
    }

    pub fn client(&self) -> CliResult<Arc<RconClient>> {
        let options = ClientOptions {
            connect_timeout: parse_duration(&self.connect_timeout)?,
            ..ClientOptions::default()
        };
        let client = RconClient::with_options(self.config()?, options)
            .map_err(|err| client_error("invalid configuration", err))?;
        Ok(Arc::new(client))
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Do not connect until the first tool call needs the server.
    #[arg(long)]
    pub lazy: bool,
}

#[derive(Args, Debug, Default)]
pub struct ToolsArgs {
    /// Only list entries of this kind.
    #[arg(long, value_parser = ["tool", "skill", "composite"])]
    pub kind: Option<String>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Tool name, e.g. move_to.
    pub name: String,
    /// Arguments as a JSON object.
    #[arg(long, default_value = "{}")]
    pub args: String,
    /// Command reply deadline (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// For skills: stay attached until the skill finishes (Ctrl-C stops it).
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Console command, e.g. "/fac_version".
    pub command: String,
    /// Reply deadline (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Command sent to measure round-trip latency.
    #[arg(long = "command", default_value = "/fac_version")]
    pub check_command: String,
    /// Reply deadline for that command (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms` / `5s` / bare seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::CONFIG;

    fn connection(port: &str, password: Option<&str>) -> ConnectionArgs {
        ConnectionArgs {
            host: DEFAULT_HOST.to_string(),
            port: port.to_string(),
            password: password.map(str::to_string),
            connect_timeout: "5s".to_string(),
        }
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn config_errors_exit_with_config_code() {
        let err = connection("70000", Some("secret")).config().unwrap_err();
        assert_eq!(err.code, CONFIG);
        assert!(err.message.contains("Invalid RCON port: 70000"), "{}", err.message);

        let err = connection("27015", None).config().unwrap_err();
        assert_eq!(err.code, CONFIG);
        assert!(err.message.contains("RCON password cannot be empty"));
    }

    #[test]
    fn valid_connection_builds_config() {
        let config = connection("27015", Some("secret")).config().unwrap();
        assert_eq!(config.port, 27015);
        assert_eq!(config.host, DEFAULT_HOST);
    }
}
