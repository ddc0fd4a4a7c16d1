use std::time::Duration;

use rconlink::{companion_id, DispatchError, Dispatcher};
use rconlink_client::CommandSender;
use rconlink_registry::CatalogEntry;
use serde_json::Value;
use tracing::info;

use crate::cmd::{parse_duration, CallArgs, ConnectionArgs};
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_json, OutputFormat};

const WAIT_POLL: Duration = Duration::from_millis(250);

pub async fn run(args: CallArgs, connection: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let arguments = parse_arguments(&args.args)?;
    let timeout = parse_duration(&args.timeout)?;
    let client = connection.client()?;
    let dispatcher = Dispatcher::new(client.clone())
        .map_err(|err| CliError::new(INTERNAL, format!("registry failed: {err}")))?
        .with_command_timeout(timeout);

    let response = dispatcher
        .call(&args.name, &arguments)
        .await
        .map_err(|err| match err {
            DispatchError::UnknownTool(_) => CliError::new(USAGE, err.to_string()),
            other => CliError::new(INTERNAL, other.to_string()),
        })?;

    match format {
        OutputFormat::Json => print_json(&response),
        _ => println!("{}", response.joined_text()),
    }

    let is_skill = matches!(
        dispatcher.registry().lookup(&args.name),
        Some(CatalogEntry::Skill(_))
    );
    if args.wait && is_skill {
        if let Some(entity_id) = companion_id(&arguments) {
            wait_for_skill(&dispatcher, entity_id).await;
        }
    }

    dispatcher.shutdown().await;
    client.disconnect().await;
    Ok(SUCCESS)
}

fn parse_arguments(raw: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| CliError::new(USAGE, format!("--args is not valid JSON: {err}")))?;
    if !value.is_object() {
        return Err(CliError::new(USAGE, "--args must be a JSON object"));
    }
    Ok(value)
}

/// Block until the skill leaves the manager; Ctrl-C stops it instead.
async fn wait_for_skill<C: CommandSender + 'static>(dispatcher: &Dispatcher<C>, entity_id: i64) {
    let skills = dispatcher.skills();
    let interrupted = tokio::select! {
        _ = async {
            while skills.is_running(entity_id) {
                tokio::time::sleep(WAIT_POLL).await;
            }
        } => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        let report = skills.stop(entity_id).await;
        info!(entity_id, summary = %report.summary, "skill stopped on interrupt");
        println!("{}", report.summary);
    }
}
