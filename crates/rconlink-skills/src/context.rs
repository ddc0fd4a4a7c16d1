use std::sync::Arc;
use std::time::Duration;

use rconlink_client::{CommandResult, CommandSender, DEFAULT_COMMAND_TIMEOUT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{Result, SkillError};

/// Map position in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Polling cadence and per-phase deadlines shared by all routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutineTiming {
    pub poll_interval: Duration,
    pub command_timeout: Duration,
    pub walk_timeout: Duration,
    pub mine_timeout: Duration,
    pub attack_timeout: Duration,
    /// Pause between combat rounds and after nudging away from a spent patch.
    pub settle_delay: Duration,
}

impl Default for RoutineTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            walk_timeout: Duration::from_secs(60),
            mine_timeout: Duration::from_secs(30),
            attack_timeout: Duration::from_secs(60),
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// Everything a routine needs to act on one companion.
pub struct SkillContext<C> {
    sender: Arc<C>,
    companion_id: i64,
    cancel: CancellationToken,
    timing: RoutineTiming,
}

impl<C: CommandSender> SkillContext<C> {
    pub fn new(
        sender: Arc<C>,
        companion_id: i64,
        cancel: CancellationToken,
        timing: RoutineTiming,
    ) -> Self {
        Self {
            sender,
            companion_id,
            cancel,
            timing,
        }
    }

    pub fn companion_id(&self) -> i64 {
        self.companion_id
    }

    pub fn timing(&self) -> &RoutineTiming {
        &self.timing
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with [`SkillError::Cancelled`] once the token fires.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(SkillError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub async fn send(&self, command: &str) -> Result<CommandResult> {
        self.checkpoint()?;
        trace!(entity_id = self.companion_id, command, "skill command");
        Ok(self
            .sender
            .send_command(command, self.timing.command_timeout)
            .await)
    }

    /// Run a command and parse its reply leniently.
    ///
    /// `None` when the command failed or returned nothing; a non-JSON reply
    /// comes back as a JSON string.
    pub async fn exec(&self, command: &str) -> Result<Option<Value>> {
        let result = self.send(command).await?;
        if !result.success || result.data.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(
            serde_json::from_str(&result.data).unwrap_or(Value::String(result.data)),
        ))
    }

    /// Run a command that must succeed with a JSON object without an
    /// `error` field.
    pub async fn exec_strict(&self, command: &str) -> Result<Value> {
        let result = self.send(command).await?;
        if !result.success {
            return Err(SkillError::Command(
                result.error.unwrap_or_else(|| "Command failed".to_string()),
            ));
        }
        let value: Value = serde_json::from_str(&result.data).map_err(|_| {
            SkillError::Command(format!("Invalid JSON response: {}", result.data))
        })?;
        if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
            let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
            return Err(SkillError::Command(message));
        }
        Ok(value)
    }

    /// Post a chat line as the companion. Failures are ignored.
    pub async fn say(&self, message: &str) -> Result<()> {
        self.send(&format!("/fac_chat_say {} {message}", self.companion_id))
            .await
            .map(|_| ())
    }

    pub async fn position(&self) -> Result<Option<Position>> {
        let data = self
            .exec(&format!("/fac_companion_position {}", self.companion_id))
            .await?;
        Ok(data
            .and_then(|data| data.get("position").cloned())
            .and_then(|position| serde_json::from_value(position).ok()))
    }

    /// Health as a percentage of maximum.
    pub async fn health_pct(&self) -> Result<Option<f64>> {
        let data = self
            .exec(&format!("/fac_companion_health {}", self.companion_id))
            .await?;
        Ok(data.and_then(|data| data.pointer("/self/pct").and_then(Value::as_f64)))
    }

    /// Count of `item` in the main inventory; 0 when unknown.
    ///
    /// The server reports an empty inventory as `{}` and a filled one as an
    /// array of `{name, count}`.
    pub async fn inventory_count(&self, item: &str) -> Result<u64> {
        let data = self
            .exec(&format!("/fac_companion_inventory {}", self.companion_id))
            .await?;
        let count = data
            .as_ref()
            .and_then(|data| data.get("items"))
            .and_then(Value::as_array)
            .and_then(|items| {
                items
                    .iter()
                    .find(|entry| entry.get("name").and_then(Value::as_str) == Some(item))
            })
            .and_then(|entry| entry.get("count").and_then(Value::as_u64))
            .unwrap_or(0);
        Ok(count)
    }

    /// True when at most one inventory slot is free; false when unknown.
    pub async fn inventory_full(&self) -> Result<bool> {
        let data = self
            .exec(&format!("/fac_companion_inventory {}", self.companion_id))
            .await?;
        let slots = |key: &str| data.as_ref().and_then(|d| d.get(key)).and_then(Value::as_u64);
        Ok(match (slots("used_slots"), slots("total_slots")) {
            (Some(used), Some(total)) => used + 1 >= total,
            _ => false,
        })
    }

    /// Sleep unless cancelled first.
    pub async fn pause(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(SkillError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Order a walk to `target` and poll until within `arrive_within` tiles.
    ///
    /// Returns false on deadline or when the position becomes unknown.
    pub async fn walk_to(
        &self,
        target: Position,
        arrive_within: f64,
        deadline: Duration,
    ) -> Result<bool> {
        self.exec(&format!(
            "/fac_move_to {} {} {}",
            self.companion_id, target.x, target.y
        ))
        .await?;

        let started = Instant::now();
        while started.elapsed() < deadline {
            let Some(position) = self.position().await? else {
                return Ok(false);
            };
            if position.distance(&target) < arrive_within {
                return Ok(true);
            }
            self.pause(self.timing.poll_interval).await?;
        }
        Ok(false)
    }
}

/// Read positional value `index` as a number.
pub(crate) fn number_arg(args: &[String], index: usize, param: &'static str) -> Result<f64> {
    let raw = args.get(index).map(String::as_str).unwrap_or_default();
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| SkillError::InvalidArgument {
            param,
            value: raw.to_string(),
        })
}

/// Read positional value `index` as a non-negative whole count.
pub(crate) fn count_arg(args: &[String], index: usize, param: &'static str) -> Result<u64> {
    let value = number_arg(args, index, param)?;
    if value < 0.0 {
        return Err(SkillError::InvalidArgument {
            param,
            value: value.to_string(),
        });
    }
    Ok(value.floor() as u64)
}

/// Read positional values `index` and `index + 1` as an optional point.
///
/// Both empty means no point; supplying only one is an error.
pub(crate) fn position_arg(
    args: &[String],
    index: usize,
    params: (&'static str, &'static str),
) -> Result<Option<Position>> {
    let blank = |i: usize| args.get(i).is_none_or(|value| value.trim().is_empty());
    match (blank(index), blank(index + 1)) {
        (true, true) => Ok(None),
        (false, false) => Ok(Some(Position::new(
            number_arg(args, index, params.0)?,
            number_arg(args, index + 1, params.1)?,
        ))),
        (true, false) => Err(SkillError::InvalidArgument {
            param: params.0,
            value: String::new(),
        }),
        (false, true) => Err(SkillError::InvalidArgument {
            param: params.1,
            value: String::new(),
        }),
    }
}

pub(crate) fn text_arg(args: &[String], index: usize, param: &'static str) -> Result<String> {
    match args.get(index).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        other => Err(SkillError::InvalidArgument {
            param,
            value: other.unwrap_or_default().to_string(),
        }),
    }
}
