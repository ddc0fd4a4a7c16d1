/// Errors raised while resolving or checking a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No tool, skill or composite has this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A required parameter without default was not supplied.
    #[error("missing required argument '{param}' for tool '{tool}'")]
    MissingArgument { tool: String, param: String },

    /// Arguments do not match the tool's input schema.
    #[error("invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// A template references a parameter that is not declared.
    #[error("template for tool '{tool}' references undeclared parameter '{placeholder}'")]
    UndeclaredPlaceholder { tool: String, placeholder: String },

    /// A generated input schema failed to compile.
    #[error("failed to compile input schema for tool '{tool}': {message}")]
    CompileFailed { tool: String, message: String },
}

impl RegistryError {
    /// Whether this is a caller mistake in the supplied arguments.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::MissingArgument { .. } | Self::InvalidArguments { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
