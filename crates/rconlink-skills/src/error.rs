/// Errors from skill lifecycle operations and routines.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    /// The companion already has a tracked skill.
    #[error("companion {entity_id} is already running {skill} (pid {pid})")]
    AlreadyRunning {
        entity_id: i64,
        skill: &'static str,
        pid: u64,
    },

    #[error("Unknown skill: {0}")]
    UnknownSkill(String),

    /// Arguments could not be resolved against the skill's parameters.
    #[error(transparent)]
    Registry(#[from] rconlink_registry::RegistryError),

    /// A resolved positional value has the wrong shape.
    #[error("invalid value {value:?} for parameter '{param}'")]
    InvalidArgument { param: &'static str, value: String },

    /// A command the routine depends on failed.
    #[error("command failed: {0}")]
    Command(String),

    /// The routine observed its cancellation token.
    #[error("skill cancelled")]
    Cancelled,

    /// The routine's task could not be joined. Absorbed by `stop`.
    #[error("skill task ended abnormally: {0}")]
    ProcessTermination(String),
}

pub type Result<T> = std::result::Result<T, SkillError>;
