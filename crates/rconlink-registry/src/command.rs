//! Turning arguments into command strings.

use serde_json::{Map, Value};

use crate::catalog::TOOLS;
use crate::error::{RegistryError, Result};
use crate::spec::ParamSpec;

/// Build the command string for tool `tool_name`.
///
/// Each parameter resolves to its argument, else its default, else the
/// empty string; a missing required parameter is an error. Runs of
/// whitespace left by empty optional values collapse to one space.
///
/// ```
/// use serde_json::json;
///
/// let command = rconlink_registry::build_command(
///     "move_to",
///     &json!({"companionId": 3, "x": 10, "y": 20}),
/// )
/// .unwrap();
/// assert_eq!(command, "/fac_move_to 3 10 20");
/// ```
pub fn build_command(tool_name: &str, arguments: &Value) -> Result<String> {
    let tool = TOOLS
        .iter()
        .find(|tool| tool.name == tool_name)
        .ok_or_else(|| RegistryError::UnknownTool(tool_name.to_string()))?;
    render_template(tool.name, tool.template, tool.params, arguments)
}

/// Substitute `{param}` placeholders in a single left-to-right pass.
///
/// Substituted values are never rescanned, so an argument containing
/// `{x}` stays literal.
pub fn render_template(
    tool_name: &str,
    template: &str,
    params: &[ParamSpec],
    arguments: &Value,
) -> Result<String> {
    let values = resolve_positional(tool_name, params, arguments)?;

    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let name = &after[..close];
        match params.iter().position(|param| param.name == name) {
            Some(index) => out.push_str(&values[index]),
            None => {
                return Err(RegistryError::UndeclaredPlaceholder {
                    tool: tool_name.to_string(),
                    placeholder: name.to_string(),
                })
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    Ok(collapse_whitespace(&out))
}

/// Resolve every parameter, in declaration order, to its string form.
pub fn resolve_positional(
    tool_name: &str,
    params: &[ParamSpec],
    arguments: &Value,
) -> Result<Vec<String>> {
    let arguments = argument_map(tool_name, arguments)?;
    params
        .iter()
        .map(|param| match arguments.and_then(|map| map.get(param.name)) {
            Some(value) if !value.is_null() => Ok(render_value(value)),
            _ => match param.default {
                Some(default) => Ok(default.to_string()),
                None if param.required => Err(RegistryError::MissingArgument {
                    tool: tool_name.to_string(),
                    param: param.name.to_string(),
                }),
                None => Ok(String::new()),
            },
        })
        .collect()
}

fn argument_map<'a>(tool_name: &str, arguments: &'a Value) -> Result<Option<&'a Map<String, Value>>> {
    match arguments {
        Value::Object(map) => Ok(Some(map)),
        Value::Null => Ok(None),
        other => Err(RegistryError::InvalidArguments {
            tool: tool_name.to_string(),
            message: format!("expected an object, got {other}"),
        }),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::spec::{DefaultValue, ParamType};

    #[test]
    fn move_to_builds_positional_command() {
        let command = build_command("move_to", &json!({"companionId": 3, "x": 10, "y": 20})).unwrap();
        assert_eq!(command, "/fac_move_to 3 10 20");
    }

    #[test]
    fn fractional_coordinates_render_as_numbers() {
        let command =
            build_command("move_to", &json!({"companionId": 1, "x": -10.5, "y": 0.25})).unwrap();
        assert_eq!(command, "/fac_move_to 1 -10.5 0.25");
    }

    #[test]
    fn missing_required_param_names_it() {
        let err = build_command("move_to", &json!({"companionId": 3, "x": 10})).unwrap_err();
        match err {
            RegistryError::MissingArgument { tool, param } => {
                assert_eq!(tool, "move_to");
                assert_eq!(param, "y");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn defaults_fill_omitted_arguments() {
        let command = build_command("world_enemies", &json!({"companionId": 2})).unwrap();
        assert_eq!(command, "/fac_world_enemies 2 50");
    }

    #[test]
    fn empty_optional_collapses_whitespace() {
        let command = build_command("chat_get", &json!({})).unwrap();
        assert_eq!(command, "/fac_chat_get");

        let command = build_command(
            "building_place",
            &json!({"companionId": 1, "entity": "stone-furnace", "x": 4, "y": 5}),
        )
        .unwrap();
        assert_eq!(command, "/fac_building_place 1 stone-furnace 4 5");
    }

    #[test]
    fn null_arguments_behave_like_empty_object() {
        assert_eq!(build_command("version", &Value::Null).unwrap(), "/fac_version");
        assert_eq!(
            build_command("chat_get", &json!({"companionId": null})).unwrap(),
            "/fac_chat_get"
        );
    }

    #[test]
    fn values_are_not_rescanned_for_placeholders() {
        let command = build_command(
            "chat_say",
            &json!({"companionId": 1, "message": "literal {companionId}  here"}),
        )
        .unwrap();
        assert_eq!(command, "/fac_chat_say 1 literal {companionId} here");
        assert!(!command.contains("{message}"));
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = build_command("mine_until", &json!({})).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTool(name) if name == "mine_until"));
    }

    #[test]
    fn non_object_arguments_are_invalid() {
        let err = build_command("version", &json!([1, 2])).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArguments { .. }));
    }

    #[test]
    fn undeclared_placeholder_is_an_error() {
        let params = [ParamSpec::required("a", ParamType::Number, "a")];
        let err = render_template("t", "/cmd {a} {b}", &params, &json!({"a": 1})).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::UndeclaredPlaceholder { placeholder, .. } if placeholder == "b"
        ));
    }

    #[test]
    fn resolve_positional_uses_declaration_order() {
        let params = [
            ParamSpec::required("companionId", ParamType::Number, "id"),
            ParamSpec::required("resource", ParamType::String, "resource"),
            ParamSpec::optional("targetAmount", ParamType::Number, "amount")
                .with_default(DefaultValue::Int(50)),
        ];
        let values = resolve_positional(
            "mine_until",
            &params,
            &json!({"resource": "iron", "companionId": 5}),
        )
        .unwrap();
        assert_eq!(values, ["5", "iron", "50"]);
    }
}
