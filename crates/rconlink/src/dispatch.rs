use std::sync::Arc;
use std::time::Duration;

use rconlink_client::{CommandSender, DEFAULT_COMMAND_TIMEOUT};
use rconlink_registry::{
    CatalogEntry, CommandRegistry, CompositeKind, CompositeSpec, RegistryError, SkillSpec,
    ToolSpec,
};
use rconlink_skills::{RoutineTiming, SkillError, SkillManager};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

/// The only failures a tool call can raise; everything else is reported as
/// response text.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The catalog failed to produce a usable registry.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// One block of tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Result of a tool call: `{content: [{type: "text", text}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub content: Vec<ToolContent>,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                kind: "text".to_string(),
                text: text.into(),
            }],
        }
    }

    /// All text blocks joined by newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn json(value: &impl Serialize) -> Self {
        Self::text(serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string()))
    }

    fn invalid(err: impl std::fmt::Display) -> Self {
        Self::text(format!("Invalid arguments: {err}"))
    }
}

/// Routes tool calls to the command sender, the skill manager or a
/// composite handler.
pub struct Dispatcher<C: CommandSender + 'static> {
    registry: CommandRegistry,
    skills: SkillManager<C>,
    sender: Arc<C>,
    command_timeout: Duration,
}

impl<C: CommandSender + 'static> Dispatcher<C> {
    pub fn new(sender: Arc<C>) -> Result<Self, DispatchError> {
        Self::with_timing(sender, RoutineTiming::default())
    }

    pub fn with_timing(sender: Arc<C>, timing: RoutineTiming) -> Result<Self, DispatchError> {
        Ok(Self {
            registry: CommandRegistry::new()?,
            skills: SkillManager::with_timing(Arc::clone(&sender), timing),
            sender,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        })
    }

    /// Deadline for commands issued directly by tool calls.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn skills(&self) -> &SkillManager<C> {
        &self.skills
    }

    /// Advertised tool list: `{name, description, inputSchema}` per entry.
    pub fn list_tools(&self) -> Vec<Value> {
        self.registry
            .schema()
            .iter()
            .map(|schema| schema.advertised())
            .collect()
    }

    /// Invoke `name` with `arguments`. Only an unknown name fails.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<ToolResponse, DispatchError> {
        let entry = self
            .registry
            .lookup(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;
        debug!(tool = name, "dispatching tool call");

        Ok(match entry {
            CatalogEntry::Tool(tool) => self.call_tool(tool, arguments).await,
            CatalogEntry::Skill(skill) => self.start_skill(skill, arguments),
            CatalogEntry::Composite(composite) => self.call_composite(composite, arguments).await,
        })
    }

    async fn call_tool(&self, tool: &'static ToolSpec, arguments: &Value) -> ToolResponse {
        let command = match self.registry.build_command(tool.name, arguments) {
            Ok(command) => command,
            Err(err) if err.is_argument_error() => return ToolResponse::invalid(err),
            Err(err) => return ToolResponse::text(format!("Error: {err}")),
        };
        let result = self
            .sender
            .send_command(&command, self.command_timeout)
            .await;
        ToolResponse::text(result.display_text())
    }

    fn start_skill(&self, skill: &'static SkillSpec, arguments: &Value) -> ToolResponse {
        if let Err(err) = self.registry.validate_arguments(skill.name, arguments) {
            return ToolResponse::invalid(err);
        }
        let Some(entity_id) = companion_id(arguments) else {
            return ToolResponse::invalid("companionId must be a whole number");
        };

        match self.skills.start(entity_id, skill.name, arguments) {
            Ok(started) => {
                info!(entity_id, skill = skill.name, pid = started.pid, "skill spawned");
                ToolResponse::text(format!(
                    "Started {} for companion {entity_id} (pid {}). Use companion_status to \
                     follow progress and companion_stop to cancel.",
                    skill.name, started.pid
                ))
            }
            Err(err @ SkillError::AlreadyRunning { .. }) => ToolResponse::text(format!(
                "{err}. Stop it with companion_stop before starting another skill."
            )),
            Err(err @ (SkillError::Registry(_) | SkillError::InvalidArgument { .. })) => {
                ToolResponse::invalid(err)
            }
            Err(err) => ToolResponse::text(format!("Error: {err}")),
        }
    }

    async fn call_composite(&self, composite: &'static CompositeSpec, arguments: &Value) -> ToolResponse {
        if let Err(err) = self.registry.validate_arguments(composite.name, arguments) {
            return ToolResponse::invalid(err);
        }
        let entity_id = companion_id(arguments);
        if entity_id.is_none() && arguments.get("companionId").is_some_and(|v| !v.is_null()) {
            return ToolResponse::invalid("companionId must be a whole number");
        }

        match (composite.kind, entity_id) {
            (CompositeKind::Status, Some(entity_id)) => {
                ToolResponse::json(&self.skills.status(entity_id).await)
            }
            (CompositeKind::Status, None) => self.status_all().await,
            (CompositeKind::Stop, Some(entity_id)) => {
                ToolResponse::json(&self.skills.stop(entity_id).await)
            }
            (CompositeKind::Stop, None) => ToolResponse::invalid("companionId is required"),
        }
    }

    /// Status of every tracked companion plus the server's companion list.
    async fn status_all(&self) -> ToolResponse {
        let mut statuses = Vec::new();
        for info in self.skills.running() {
            statuses.push(self.skills.status(info.entity_id).await);
        }
        let companions = self
            .sender
            .send_command("/fac_companion_list", self.command_timeout)
            .await
            .json_value();

        ToolResponse::json(&json!({
            "companions": companions,
            "runningSkills": statuses,
        }))
    }

    /// Cancel every running skill.
    pub async fn shutdown(&self) {
        self.skills.shutdown().await;
    }
}

/// The `companionId` argument as an integer, accepting whole floats.
pub fn companion_id(arguments: &Value) -> Option<i64> {
    let value = arguments.get("companionId")?;
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|id| id.fract() == 0.0 && id.abs() < i64::MAX as f64)
            .map(|id| id as i64)
    })
}
