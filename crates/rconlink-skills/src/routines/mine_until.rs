use std::collections::HashSet;

use rconlink_client::CommandSender;
use serde_json::Value;
use tracing::{debug, info};

use crate::context::{count_arg, position_arg, text_arg, Position, SkillContext};
use crate::error::{Result, SkillError};

const MAX_ROUNDS: u32 = 50;
const BATCH_SIZE: u64 = 50;
const STUCK_LIMIT: u32 = 3;
const MAX_RESCANS: u32 = 10;
/// Patches closer than this are mined without walking.
const REACH: f64 = 5.0;
const ARRIVE_WITHIN: f64 = 2.0;

/// Expand the short resource names players tend to use.
pub fn normalize_resource(name: &str) -> String {
    match name {
        "iron" => "iron-ore",
        "copper" => "copper-ore",
        "uranium" => "uranium-ore",
        other => other,
    }
    .to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct MineUntil {
    pub resource: String,
    pub target_amount: u64,
    /// Walked back to once mining ends.
    pub return_to: Option<Position>,
}

struct Patch {
    position: Position,
    distance: f64,
}

fn spot_key(position: &Position) -> String {
    format!("{},{}", position.x, position.y)
}

impl MineUntil {
    pub fn from_positional(args: &[String]) -> Result<Self> {
        Ok(Self {
            resource: normalize_resource(&text_arg(args, 1, "resource")?),
            target_amount: count_arg(args, 2, "targetAmount")?,
            return_to: position_arg(args, 3, ("returnX", "returnY"))?,
        })
    }

    pub async fn run<C: CommandSender>(&self, ctx: &SkillContext<C>) -> Result<String> {
        match self.mine(ctx).await {
            Err(err) if !matches!(err, SkillError::Cancelled) => {
                ctx.say(&format!("Error during mining: {err}")).await?;
                Err(err)
            }
            other => other,
        }
    }

    async fn mine<C: CommandSender>(&self, ctx: &SkillContext<C>) -> Result<String> {
        let id = ctx.companion_id();
        let resource = self.resource.as_str();
        let target = self.target_amount;
        info!(entity_id = id, resource, target, "mine_until starting");
        ctx.say(&format!(
            "Starting to mine {resource} until I have {target}..."
        ))
        .await?;

        let mut total = 0u64;
        let mut rounds = 0u32;
        let mut visited: HashSet<String> = HashSet::new();
        let mut zero_streak = 0u32;

        while total < target && rounds < MAX_ROUNDS {
            rounds += 1;

            let held = ctx.inventory_count(resource).await?;
            if held >= target {
                ctx.say(&format!("I already have {held} {resource}!")).await?;
                break;
            }

            let mut nearest = self.find_nearest(ctx).await?;
            let mut rescans = 0;
            while rescans < MAX_RESCANS {
                match &nearest {
                    Some(patch) if visited.contains(&spot_key(&patch.position)) => {}
                    _ => break,
                }
                if let Some(here) = ctx.position().await? {
                    let (dx, dy) = nudge(rescans);
                    ctx.exec(&format!("/fac_move_to {id} {} {}", here.x + dx, here.y + dy))
                        .await?;
                    ctx.pause(ctx.timing().settle_delay).await?;
                }
                nearest = self.find_nearest(ctx).await?;
                rescans += 1;
            }

            let Some(patch) = nearest else {
                ctx.say(&format!("No more {resource} found nearby.")).await?;
                break;
            };
            let key = spot_key(&patch.position);
            debug!(
                entity_id = id,
                x = patch.position.x,
                y = patch.position.y,
                distance = patch.distance,
                "found patch"
            );

            if patch.distance > REACH {
                ctx.say(&format!(
                    "Walking to {resource} ({} tiles)...",
                    patch.distance.floor()
                ))
                .await?;
                let arrived = ctx
                    .walk_to(patch.position, ARRIVE_WITHIN, ctx.timing().walk_timeout)
                    .await?;
                if !arrived {
                    debug!(entity_id = id, spot = %key, "could not reach patch");
                    visited.insert(key);
                    continue;
                }
            }

            let batch = (target - total).min(BATCH_SIZE);
            if !self.start_mining(ctx, patch.position, batch).await? {
                debug!(entity_id = id, spot = %key, "mining did not start");
                visited.insert(key);
                continue;
            }

            let harvested = self.wait_for_mining(ctx).await?;
            total += harvested;
            debug!(entity_id = id, harvested, total, target, "mining batch done");

            if harvested == 0 {
                zero_streak += 1;
                if zero_streak >= STUCK_LIMIT {
                    visited.insert(key);
                    zero_streak = 0;
                    ctx.say("Spot depleted, looking for another...").await?;
                }
            } else {
                zero_streak = 0;
                if total < target {
                    if ctx.inventory_full().await? {
                        ctx.say("Inventory full, stopping here.").await?;
                        break;
                    }
                    ctx.say(&format!("Mined {total}/{target}...")).await?;
                }
            }
        }

        if let Some(home) = self.return_to {
            ctx.say(&format!("Returning to ({}, {})...", home.x, home.y))
                .await?;
            if !ctx.walk_to(home, ARRIVE_WITHIN, ctx.timing().walk_timeout).await? {
                debug!(entity_id = id, x = home.x, y = home.y, "did not reach return point");
            }
        }

        let held = ctx.inventory_count(resource).await?;
        ctx.say(&format!("Done! I have {held} {resource} in inventory."))
            .await?;
        info!(entity_id = id, resource, total, held, "mine_until finished");
        Ok(format!("mined {total} {resource}; inventory holds {held}"))
    }

    async fn find_nearest<C: CommandSender>(&self, ctx: &SkillContext<C>) -> Result<Option<Patch>> {
        let data = ctx
            .exec(&format!(
                "/fac_resource_nearest {} {}",
                ctx.companion_id(),
                self.resource
            ))
            .await?;
        let Some(data) = data else {
            return Ok(None);
        };
        if data.get("error").is_some_and(|e| !e.is_null()) {
            return Ok(None);
        }
        let Some(position) = data
            .get("position")
            .and_then(|p| serde_json::from_value::<Position>(p.clone()).ok())
        else {
            return Ok(None);
        };
        let distance = data.get("distance").and_then(Value::as_f64).unwrap_or(0.0);
        Ok(Some(Patch { position, distance }))
    }

    async fn start_mining<C: CommandSender>(
        &self,
        ctx: &SkillContext<C>,
        at: Position,
        count: u64,
    ) -> Result<bool> {
        let data = ctx
            .exec(&format!(
                "/fac_resource_mine {} {} {} {count} {}",
                ctx.companion_id(),
                at.x,
                at.y,
                self.resource
            ))
            .await?;
        Ok(data.and_then(|d| d.get("mining").and_then(Value::as_bool)) == Some(true))
    }

    async fn wait_for_mining<C: CommandSender>(&self, ctx: &SkillContext<C>) -> Result<u64> {
        let id = ctx.companion_id();
        let started = tokio::time::Instant::now();
        let mut harvested = 0;

        while started.elapsed() < ctx.timing().mine_timeout {
            let data = ctx
                .exec(&format!("/fac_resource_mine_status {id}"))
                .await?;
            let status = data.as_ref().and_then(|d| d.get("status"));
            if let Some(count) = status.and_then(|s| s.get("harvested")).and_then(Value::as_u64) {
                harvested = count;
            }
            let active = status
                .and_then(|s| s.get("active"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !active {
                return Ok(harvested);
            }
            ctx.pause(ctx.timing().poll_interval).await?;
        }

        ctx.exec(&format!("/fac_resource_mine_stop {id}")).await?;
        Ok(harvested)
    }
}

/// Offset for the n-th attempt to step away from an exhausted patch.
fn nudge(attempt: u32) -> (f64, f64) {
    let reach = 5.0 * f64::from(1 + attempt / 4);
    match attempt % 4 {
        0 => (reach, 0.0),
        1 => (0.0, reach),
        2 => (-reach, 0.0),
        _ => (0.0, -reach),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn aliases_expand() {
        assert_eq!(normalize_resource("iron"), "iron-ore");
        assert_eq!(normalize_resource("copper"), "copper-ore");
        assert_eq!(normalize_resource("coal"), "coal");
        assert_eq!(normalize_resource("stone"), "stone");
        assert_eq!(normalize_resource("uranium"), "uranium-ore");
        assert_eq!(normalize_resource("wood"), "wood");
    }

    #[test]
    fn parses_positional_arguments() {
        let plan = MineUntil::from_positional(&args(&["1", "iron", "120"])).unwrap();
        assert_eq!(
            plan,
            MineUntil {
                resource: "iron-ore".to_string(),
                target_amount: 120,
                return_to: None,
            }
        );

        let plan = MineUntil::from_positional(&args(&["1", "coal", "10", "-4", "18.5"])).unwrap();
        assert_eq!(plan.return_to, Some(Position::new(-4.0, 18.5)));
    }

    #[test]
    fn half_a_return_point_is_rejected() {
        let err = MineUntil::from_positional(&args(&["1", "coal", "10", "-4", ""])).unwrap_err();
        assert!(matches!(err, SkillError::InvalidArgument { param: "returnY", .. }));
    }

    #[test]
    fn missing_resource_is_rejected() {
        let err = MineUntil::from_positional(&args(&["1", "", "50"])).unwrap_err();
        assert!(matches!(err, SkillError::InvalidArgument { param: "resource", .. }));
    }

    #[test]
    fn nudges_cycle_and_grow() {
        assert_eq!(nudge(0), (5.0, 0.0));
        assert_eq!(nudge(3), (0.0, -5.0));
        assert_eq!(nudge(4), (10.0, 0.0));
    }
}
