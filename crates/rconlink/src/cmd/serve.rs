use rconlink::server::serve;
use rconlink::Dispatcher;
use rconlink_client::ClientError;
use tokio::io::BufReader;
use tracing::{info, warn};

use crate::cmd::{ConnectionArgs, ServeArgs};
use crate::exit::{client_error, io_error, CliError, CliResult, INTERNAL, SUCCESS};

pub async fn run(args: ServeArgs, connection: &ConnectionArgs) -> CliResult<i32> {
    let client = connection.client()?;

    if !args.lazy {
        match client.connect().await {
            Ok(()) => {}
            Err(err @ ClientError::Authentication(_)) => {
                return Err(client_error("connect failed", err));
            }
            Err(err) => {
                warn!(error = %err, "server unreachable, will reconnect on first call");
            }
        }
    }

    let dispatcher = Dispatcher::new(client.clone())
        .map_err(|err| CliError::new(INTERNAL, format!("registry failed: {err}")))?
        .with_command_timeout(client.options().command_timeout);
    info!(endpoint = %client.endpoint(), tools = dispatcher.list_tools().len(), "serving on stdio");

    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    let outcome = tokio::select! {
        result = serve(&dispatcher, reader, writer) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    dispatcher.shutdown().await;
    client.disconnect().await;

    match outcome {
        Some(Ok(handled)) => info!(handled, "input closed, shutting down"),
        Some(Err(err)) => return Err(io_error("stdio failed", err)),
        None => info!("interrupted, shutting down"),
    }
    Ok(SUCCESS)
}
