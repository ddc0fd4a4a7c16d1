//! Advertised schema, generated from the catalog.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::catalog::{entries, CatalogEntry};
use crate::spec::{ParamSpec, ParamType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Tool,
    Skill,
    Composite,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Skill => "skill",
            Self::Composite => "composite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSchema {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub description: &'static str,
}

/// One advertised operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: EntryKind,
    pub parameters: Vec<ParamSchema>,
    pub required: Vec<&'static str>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolSchema {
    /// The `{name, description, inputSchema}` shape tool-calling clients expect.
    pub fn advertised(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

/// Describe every tool, skill and composite in the catalog.
pub fn generate_schema() -> Vec<ToolSchema> {
    entries().map(describe).collect()
}

fn describe(entry: CatalogEntry) -> ToolSchema {
    let kind = match entry {
        CatalogEntry::Tool(_) => EntryKind::Tool,
        CatalogEntry::Skill(_) => EntryKind::Skill,
        CatalogEntry::Composite(_) => EntryKind::Composite,
    };
    let description = match entry {
        CatalogEntry::Tool(spec) => spec.description,
        CatalogEntry::Skill(spec) => spec.description,
        CatalogEntry::Composite(spec) => spec.description,
    };
    let params = entry.params();

    ToolSchema {
        name: entry.name(),
        description,
        kind,
        parameters: params
            .iter()
            .map(|param| ParamSchema {
                name: param.name,
                kind: param.kind,
                required: param.required,
                default: param.default.map(|d| d.to_json()),
                description: param.description,
            })
            .collect(),
        required: required_names(params),
        input_schema: input_schema(params),
    }
}

fn required_names(params: &[ParamSpec]) -> Vec<&'static str> {
    params
        .iter()
        .filter(|param| param.required)
        .map(|param| param.name)
        .collect()
}

/// JSON Schema object for a parameter list.
pub fn input_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    for param in params {
        let mut property = Map::new();
        property.insert("type".into(), Value::from(param.kind.json_type()));
        property.insert("description".into(), Value::from(param.description));
        if let Some(default) = param.default {
            property.insert("default".into(), default.to_json());
        }
        properties.insert(param.name.into(), Value::Object(property));
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required_names(params),
    })
}
