//! Static descriptions of callable operations.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Wire type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Number,
    String,
}

impl ParamType {
    /// JSON Schema `type` keyword value.
    pub fn json_type(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
        }
    }
}

/// Value substituted when an argument is omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Int(i64),
    Text(&'static str),
}

impl DefaultValue {
    pub fn to_json(self) -> Value {
        match self {
            Self::Int(value) => Value::from(value),
            Self::Text(value) => Value::from(value),
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            description,
        }
    }

    pub const fn with_default(mut self, default: DefaultValue) -> Self {
        self.required = false;
        self.default = Some(default);
        self
    }
}

/// A tool backed by a single command template.
///
/// Placeholders are written `{paramName}` and must name a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub template: &'static str,
    pub params: &'static [ParamSpec],
}

/// Background routine a skill launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineRef {
    MineUntil,
    CombatUntil,
    BuildSmelterLine,
}

impl RoutineRef {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MineUntil => "mine_until",
            Self::CombatUntil => "combat_until",
            Self::BuildSmelterLine => "build_smelter_line",
        }
    }
}

impl fmt::Display for RoutineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool that starts a long-running routine on one entity.
///
/// The first parameter is always the entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub routine: RoutineRef,
    pub params: &'static [ParamSpec],
}

/// Handlers that merge server state with local skill tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    Status,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: CompositeKind,
    pub params: &'static [ParamSpec],
}
