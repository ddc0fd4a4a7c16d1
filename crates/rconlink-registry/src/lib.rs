//! Declarative command registry.
//!
//! One static catalog describes every externally callable operation: plain
//! tools backed by a command template, skills backed by a background
//! routine, and composite handlers. The advertised JSON schema, argument
//! validation and command-string building are all derived from it.

pub mod catalog;
pub mod command;
pub mod error;
pub mod registry;
pub mod schema;
pub mod spec;
pub mod validator;

pub use catalog::{entries, lookup, CatalogEntry, COMPOSITES, SKILLS, TOOLS};
pub use command::{build_command, render_template, resolve_positional};
pub use error::{RegistryError, Result};
pub use registry::CommandRegistry;
pub use schema::{generate_schema, input_schema, EntryKind, ParamSchema, ToolSchema};
pub use spec::{
    CompositeKind, CompositeSpec, DefaultValue, ParamSpec, ParamType, RoutineRef, SkillSpec,
    ToolSpec,
};
