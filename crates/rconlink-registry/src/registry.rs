use std::collections::HashMap;
use std::fmt;

use jsonschema::Validator;
use serde_json::Value;
use tracing::debug;

use crate::catalog::{lookup, CatalogEntry};
use crate::command::{render_template, resolve_positional};
use crate::error::{RegistryError, Result};
use crate::schema::{generate_schema, ToolSchema};
use crate::validator::{compile, validate_arguments};

/// The catalog with its generated schemas and compiled argument validators.
///
/// Built once at startup and read-only afterwards.
pub struct CommandRegistry {
    schemas: Vec<ToolSchema>,
    validators: HashMap<&'static str, Validator>,
}

impl CommandRegistry {
    /// Generate every schema and compile its validator.
    pub fn new() -> Result<Self> {
        let schemas = generate_schema();
        let mut validators = HashMap::with_capacity(schemas.len());
        for schema in &schemas {
            validators.insert(schema.name, compile(schema.name, &schema.input_schema)?);
        }
        debug!(entries = schemas.len(), "command registry loaded");
        Ok(Self {
            schemas,
            validators,
        })
    }

    /// Advertised schema, tools first, then skills, then composites.
    pub fn schema(&self) -> &[ToolSchema] {
        &self.schemas
    }

    pub fn lookup(&self, name: &str) -> Option<CatalogEntry> {
        lookup(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Check `arguments` against the input schema of `name`.
    pub fn validate_arguments(&self, name: &str, arguments: &Value) -> Result<()> {
        let validator = self
            .validators
            .get(name)
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))?;
        validate_arguments(name, arguments, validator)
    }

    /// Validate, then build the command string for a template-backed tool.
    pub fn build_command(&self, name: &str, arguments: &Value) -> Result<String> {
        match self.lookup(name) {
            Some(CatalogEntry::Tool(tool)) => {
                self.validate_arguments(name, arguments)?;
                render_template(tool.name, tool.template, tool.params, arguments)
            }
            _ => Err(RegistryError::UnknownTool(name.to_string())),
        }
    }

    /// Validate, then resolve an entry's parameters to positional strings.
    pub fn resolve(&self, entry: CatalogEntry, arguments: &Value) -> Result<Vec<String>> {
        self.validate_arguments(entry.name(), arguments)?;
        resolve_positional(entry.name(), entry.params(), arguments)
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field(
                "entries",
                &self.schemas.iter().map(|s| s.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
