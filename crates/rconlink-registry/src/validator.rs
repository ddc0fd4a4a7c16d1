use jsonschema::Validator;
use serde_json::Value;

use crate::error::{RegistryError, Result};

pub(crate) fn compile(tool: &str, schema: &Value) -> Result<Validator> {
    jsonschema::validator_for(schema).map_err(|err| RegistryError::CompileFailed {
        tool: tool.to_string(),
        message: err.to_string(),
    })
}

pub(crate) fn validate_arguments(tool: &str, arguments: &Value, validator: &Validator) -> Result<()> {
    let empty = Value::Object(Default::default());
    let arguments = if arguments.is_null() { &empty } else { arguments };

    let mut errors = validator.iter_errors(arguments);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(3) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(RegistryError::InvalidArguments {
            tool: tool.to_string(),
            message,
        });
    }

    Ok(())
}
