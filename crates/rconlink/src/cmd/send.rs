use rconlink_client::CommandResult;

use crate::cmd::{parse_duration, ConnectionArgs, SendArgs};
use crate::exit::{client_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_result, OutputFormat};

pub async fn run(args: SendArgs, connection: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let client = connection.client()?;
    client
        .connect()
        .await
        .map_err(|err| client_error("connect failed", err))?;

    let frame = client
        .execute(&args.command, timeout)
        .await
        .map_err(|err| client_error("send failed", err))?;
    let result = CommandResult::ok(frame.text());
    print_result(&args.command, &result, format);
    client.disconnect().await;

    // Server-side failures arrive as a JSON body with an `error` field.
    let server_error = result
        .json_value()
        .is_some_and(|value| value.get("error").is_some_and(|e| !e.is_null()));
    Ok(if server_error { FAILURE } else { SUCCESS })
}
