use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rconlink_client::CommandResult;
use rconlink_registry::ToolSchema;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Print a command reply. Raw mode writes the reply text unchanged.
pub fn print_result(command: &str, result: &CommandResult, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "SUCCESS", "RESPONSE"])
                .add_row(vec![
                    command.to_string(),
                    result.success.to_string(),
                    result.display_text(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match result.json_value() {
            Some(value) if value.is_object() || value.is_array() => println!(
                "{}",
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| result.display_text())
            ),
            _ => println!("{}", result.display_text()),
        },
        OutputFormat::Raw => print_raw(result.display_text().as_bytes()),
    }
}

pub fn print_tools(schemas: &[ToolSchema], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let tools: Vec<_> = schemas.iter().map(ToolSchema::advertised).collect();
            print_json(&tools);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAME", "KIND", "PARAMETERS", "DESCRIPTION"]);
            for schema in schemas {
                table.add_row(vec![
                    schema.name.to_string(),
                    schema.kind.as_str().to_string(),
                    parameter_summary(schema),
                    schema.description.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for schema in schemas {
                println!("{} ({})", schema.name, schema.kind.as_str());
                println!("    {}", schema.description);
                if !schema.parameters.is_empty() {
                    println!("    params: {}", parameter_summary(schema));
                }
            }
        }
        OutputFormat::Raw => {
            for schema in schemas {
                println!("{}", schema.name);
            }
        }
    }
}

/// `name` for required parameters, `[name]` for optional ones.
fn parameter_summary(schema: &ToolSchema) -> String {
    schema
        .parameters
        .iter()
        .map(|param| {
            if schema.required.contains(&param.name) {
                param.name.to_string()
            } else {
                format!("[{}]", param.name)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}
