use std::fmt;

use rconlink_client::CommandSender;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::context::{count_arg, text_arg, Position, SkillContext};
use crate::error::{Result, SkillError};

const MAX_ROUNDS: u32 = 30;
const SCAN_RADIUS: u32 = 50;
const ATTACK_RANGE: f64 = 6.0;
const RETREAT_BELOW_PCT: f64 = 30.0;

/// Which enemies to hunt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    All,
    Spawner,
    Worm,
    Biter,
    Spitter,
}

impl TargetType {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "all" => Self::All,
            "spawner" => Self::Spawner,
            "worm" => Self::Worm,
            "biter" => Self::Biter,
            "spitter" => Self::Spitter,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Spawner => "spawner",
            Self::Worm => "worm",
            Self::Biter => "biter",
            Self::Spitter => "spitter",
        }
    }

    fn matches(self, enemy: &Enemy) -> bool {
        match self {
            Self::All => true,
            Self::Spawner => enemy.kind == "unit-spawner",
            Self::Worm => enemy.kind == "turret",
            Self::Biter => enemy.name.contains("biter"),
            Self::Spitter => enemy.name.contains("spitter"),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Enemy {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    position: Position,
    #[serde(default)]
    distance: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatUntil {
    pub target_type: TargetType,
    pub max_kills: u64,
}

impl CombatUntil {
    pub fn from_positional(args: &[String]) -> Result<Self> {
        let raw = text_arg(args, 1, "targetType")?;
        let target_type = TargetType::parse(&raw).ok_or(SkillError::InvalidArgument {
            param: "targetType",
            value: raw,
        })?;
        Ok(Self {
            target_type,
            max_kills: count_arg(args, 2, "maxKills")?,
        })
    }

    pub async fn run<C: CommandSender>(&self, ctx: &SkillContext<C>) -> Result<String> {
        match self.fight(ctx).await {
            Err(err) if !matches!(err, SkillError::Cancelled) => {
                ctx.say(&format!("Error: {err}")).await?;
                Err(err)
            }
            other => other,
        }
    }

    async fn fight<C: CommandSender>(&self, ctx: &SkillContext<C>) -> Result<String> {
        let id = ctx.companion_id();
        let target_type = self.target_type;
        info!(entity_id = id, target = %target_type, max_kills = self.max_kills, "combat_until starting");

        ctx.exec(&format!("/fac_companion_stop_all {id}")).await?;
        ctx.say(&format!("Combat mode: hunting {target_type}!")).await?;

        let mut kills = 0u64;
        let mut rounds = 0u32;
        while kills < self.max_kills && rounds < MAX_ROUNDS {
            rounds += 1;

            let enemies = self.scan(ctx).await?;
            let Some(target) = enemies.into_iter().next() else {
                ctx.say(&format!("No more {target_type} enemies in range."))
                    .await?;
                break;
            };
            debug!(
                entity_id = id,
                enemy = %target.name,
                x = target.position.x,
                y = target.position.y,
                distance = target.distance,
                "target selected"
            );

            if target.distance > ATTACK_RANGE {
                ctx.say(&format!(
                    "Moving to {} ({} tiles)...",
                    target.name,
                    target.distance.floor()
                ))
                .await?;
                let arrived = ctx
                    .walk_to(target.position, ATTACK_RANGE, ctx.timing().walk_timeout)
                    .await?;
                if !arrived {
                    debug!(entity_id = id, enemy = %target.name, "could not reach target");
                    continue;
                }
            }

            ctx.say(&format!("Attacking {}!", target.name)).await?;
            let round_kills = self.attack(ctx, target.position).await?;
            kills += round_kills;
            if round_kills > 0 {
                ctx.say(&format!(
                    "Killed {round_kills}! Total: {kills}/{}",
                    self.max_kills
                ))
                .await?;
            }

            ctx.pause(ctx.timing().settle_delay).await?;
        }

        ctx.say(&format!("Combat done! {kills} kills.")).await?;
        info!(entity_id = id, kills, "combat_until finished");
        Ok(format!("{kills} kills"))
    }

    async fn scan<C: CommandSender>(&self, ctx: &SkillContext<C>) -> Result<Vec<Enemy>> {
        let data = ctx
            .exec(&format!(
                "/fac_world_enemies {} {SCAN_RADIUS}",
                ctx.companion_id()
            ))
            .await?;
        let mut enemies: Vec<Enemy> = data
            .as_ref()
            .and_then(|d| d.get("enemies"))
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|e| serde_json::from_value::<Enemy>(e.clone()).ok())
                    .filter(|e| self.target_type.matches(e))
                    .collect()
            })
            .unwrap_or_default();
        enemies.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(enemies)
    }

    /// Attack until the server reports the attack inactive, health runs
    /// low, or the deadline passes. Returns the kills reported.
    async fn attack<C: CommandSender>(&self, ctx: &SkillContext<C>, at: Position) -> Result<u64> {
        let id = ctx.companion_id();
        let started = ctx
            .exec(&format!("/fac_action_attack_start {id} {} {}", at.x, at.y))
            .await?;
        if started.and_then(|d| d.get("started").and_then(Value::as_bool)) != Some(true) {
            return Ok(0);
        }

        let begun = tokio::time::Instant::now();
        while begun.elapsed() < ctx.timing().attack_timeout {
            let data = ctx
                .exec(&format!("/fac_action_attack_status {id}"))
                .await?;
            let status = data.as_ref().and_then(|d| d.get("status"));
            let active = status
                .and_then(|s| s.get("active"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !active {
                return Ok(status
                    .and_then(|s| s.get("kills"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0));
            }

            if ctx
                .health_pct()
                .await?
                .is_some_and(|pct| pct < RETREAT_BELOW_PCT)
            {
                ctx.say("Health low, retreating!").await?;
                ctx.exec(&format!("/fac_action_attack_stop {id}")).await?;
                return Ok(0);
            }

            ctx.pause(ctx.timing().poll_interval).await?;
        }
        Ok(0)
    }
}
