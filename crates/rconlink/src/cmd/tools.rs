use rconlink_registry::CommandRegistry;

use crate::cmd::ToolsArgs;
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_tools, OutputFormat};

pub fn run(args: ToolsArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = CommandRegistry::new()
        .map_err(|err| CliError::new(INTERNAL, format!("registry failed: {err}")))?;
    let schemas: Vec<_> = registry
        .schema()
        .iter()
        .filter(|schema| {
            args.kind
                .as_deref()
                .is_none_or(|kind| schema.kind.as_str() == kind)
        })
        .cloned()
        .collect();
    print_tools(&schemas, format);
    Ok(SUCCESS)
}
