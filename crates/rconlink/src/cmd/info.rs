use std::time::Instant;

use serde::Serialize;

use crate::cmd::{parse_duration, ConnectionArgs, InfoArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct InfoOutput {
    host: String,
    port: u16,
    state: &'static str,
    check_command: String,
    response: String,
    latency_ms: f64,
    connected: bool,
}

pub async fn run(args: InfoArgs, connection: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let client = connection.client()?;
    client
        .connect()
        .await
        .map_err(|err| client_error("connect failed", err))?;

    let started = Instant::now();
    let frame = client
        .execute(&args.check_command, timeout)
        .await
        .map_err(|err| client_error("check command failed", err))?;
    let latency_ms = (started.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0;

    let endpoint = client.endpoint();
    let out = InfoOutput {
        host: endpoint.host.clone(),
        port: endpoint.port,
        state: client.state().as_str(),
        check_command: args.check_command,
        response: frame.text().trim().to_string(),
        latency_ms,
        connected: client.is_connected(),
    };
    client.disconnect().await;

    print_info(&out, format);
    Ok(SUCCESS)
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => crate::output::print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Connection Info:");
            println!("  Endpoint:  {}:{}", out.host, out.port);
            println!("  State:     {}", out.state);
            println!("  Check:     {}", out.check_command);
            println!("  Response:  {}", out.response);
            println!("  Latency:   {:.2}ms", out.latency_ms);
        }
        OutputFormat::Raw => println!("{}", out.response),
    }
}
