use rconlink_registry::{
    build_command, generate_schema, lookup, CatalogEntry, CommandRegistry, EntryKind,
};
use serde_json::{json, Value};

/// Minimal valid arguments for a schema: required numbers get 1, strings "x".
fn minimal_arguments(input_schema: &Value) -> Value {
    let mut args = serde_json::Map::new();
    let properties = &input_schema["properties"];
    for name in input_schema["required"].as_array().into_iter().flatten() {
        let name = name.as_str().expect("required names are strings");
        let value = match properties[name]["type"].as_str() {
            Some("number") => json!(1),
            _ => json!("x"),
        };
        args.insert(name.to_string(), value);
    }
    Value::Object(args)
}

#[test]
fn every_tool_builds_from_minimal_arguments() {
    let registry = CommandRegistry::new().expect("registry should load");
    for schema in generate_schema() {
        if schema.kind != EntryKind::Tool {
            continue;
        }
        let args = minimal_arguments(&schema.input_schema);
        let command = registry
            .build_command(schema.name, &args)
            .unwrap_or_else(|err| panic!("{}: {err}", schema.name));
        assert!(command.starts_with("/fac_"), "{command}");
        assert!(!command.contains('{'), "unsubstituted placeholder in {command}");
        assert!(!command.contains("  "), "uncollapsed whitespace in {command}");
        assert_eq!(command, build_command(schema.name, &args).unwrap());
    }
}

#[test]
fn dropping_any_required_argument_fails_without_placeholder() {
    for schema in generate_schema() {
        if schema.kind != EntryKind::Tool {
            continue;
        }
        let full = minimal_arguments(&schema.input_schema);
        for required in &schema.required {
            let mut args = full.clone();
            args.as_object_mut().unwrap().remove(*required);
            let err = build_command(schema.name, &args).unwrap_err();
            assert!(err.to_string().contains(required), "{err}");
        }
    }
}

#[test]
fn skills_and_composites_validate_minimal_arguments() {
    let registry = CommandRegistry::new().expect("registry should load");
    for schema in generate_schema() {
        if schema.kind == EntryKind::Tool {
            continue;
        }
        let args = minimal_arguments(&schema.input_schema);
        registry
            .validate_arguments(schema.name, &args)
            .unwrap_or_else(|err| panic!("{}: {err}", schema.name));
    }
}

#[test]
fn composite_status_accepts_no_companion() {
    let registry = CommandRegistry::new().expect("registry should load");
    assert!(matches!(
        lookup("companion_status"),
        Some(CatalogEntry::Composite(_))
    ));
    registry
        .validate_arguments("companion_status", &json!({}))
        .unwrap();
}
