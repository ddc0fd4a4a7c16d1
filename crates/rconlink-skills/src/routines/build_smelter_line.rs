use rconlink_client::CommandSender;
use serde_json::Value;
use tracing::{debug, info};

use crate::context::{count_arg, number_arg, text_arg, Position, SkillContext};
use crate::error::{Result, SkillError};

/// All furnace prototypes occupy 2x2 tiles.
const FURNACE_SPACING: f64 = 2.0;
const FURNACE_TYPES: &[&str] = &["stone-furnace", "steel-furnace", "electric-furnace"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDirection {
    Horizontal,
    Vertical,
}

/// Side of each furnace the inserter feeds from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl InputSide {
    fn offset(self) -> (f64, f64) {
        match self {
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
            Self::Top => (0.0, -1.0),
            Self::Bottom => (0.0, 1.0),
        }
    }

    /// Inserter facing that points at the furnace: 0=N, 1=E, 2=S, 3=W.
    fn inserter_direction(self) -> u8 {
        match self {
            Self::Left => 1,
            Self::Right => 3,
            Self::Top => 2,
            Self::Bottom => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildSmelterLine {
    pub start: Position,
    pub count: u64,
    pub furnace_type: String,
    pub direction: LineDirection,
    pub input_side: InputSide,
}

impl BuildSmelterLine {
    pub fn from_positional(args: &[String]) -> Result<Self> {
        let furnace_type = text_arg(args, 4, "furnaceType")?;
        if !FURNACE_TYPES.contains(&furnace_type.as_str()) {
            return Err(SkillError::InvalidArgument {
                param: "furnaceType",
                value: furnace_type,
            });
        }
        let direction = match text_arg(args, 5, "direction")?.as_str() {
            "horizontal" => LineDirection::Horizontal,
            "vertical" => LineDirection::Vertical,
            other => {
                return Err(SkillError::InvalidArgument {
                    param: "direction",
                    value: other.to_string(),
                })
            }
        };
        let input_side = match text_arg(args, 6, "inputSide")?.as_str() {
            "left" => InputSide::Left,
            "right" => InputSide::Right,
            "top" => InputSide::Top,
            "bottom" => InputSide::Bottom,
            other => {
                return Err(SkillError::InvalidArgument {
                    param: "inputSide",
                    value: other.to_string(),
                })
            }
        };
        Ok(Self {
            start: Position::new(number_arg(args, 1, "x")?, number_arg(args, 2, "y")?),
            count: count_arg(args, 3, "count")?,
            furnace_type,
            direction,
            input_side,
        })
    }

    /// Furnace and inserter positions for furnace `index`.
    fn slot(&self, index: u64) -> (Position, Position) {
        let step = FURNACE_SPACING * index as f64;
        let furnace = match self.direction {
            LineDirection::Horizontal => Position::new(self.start.x + step, self.start.y),
            LineDirection::Vertical => Position::new(self.start.x, self.start.y + step),
        };
        let (dx, dy) = self.input_side.offset();
        (furnace, Position::new(furnace.x + dx, furnace.y + dy))
    }

    pub async fn run<C: CommandSender>(&self, ctx: &SkillContext<C>) -> Result<String> {
        let id = ctx.companion_id();
        let furnace = self.furnace_type.as_str();
        let facing = self.input_side.inserter_direction();
        info!(entity_id = id, furnace, count = self.count, "build_smelter_line starting");

        let mut placed: Vec<String> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        for index in 0..self.count {
            let (at, feed) = self.slot(index);

            match ctx
                .exec_strict(&format!(
                    "/fac_building_can_place {id} {furnace} {} {}",
                    at.x, at.y
                ))
                .await
            {
                Ok(check) if can_place(&check) => {}
                Ok(check) => {
                    let reason = check
                        .get("reason")
                        .and_then(Value::as_str)
                        .unwrap_or("blocked");
                    errors.push(format!(
                        "Cannot place {furnace} at ({}, {}): {reason}",
                        at.x, at.y
                    ));
                    continue;
                }
                Err(SkillError::Cancelled) => return Err(SkillError::Cancelled),
                Err(err) => {
                    errors.push(format!(
                        "Check failed for furnace at ({}, {}): {err}",
                        at.x, at.y
                    ));
                    continue;
                }
            }

            match ctx
                .exec_strict(&format!(
                    "/fac_building_place {id} {furnace} {} {}",
                    at.x, at.y
                ))
                .await
            {
                Ok(_) => placed.push(format!("{furnace} at ({}, {})", at.x, at.y)),
                Err(SkillError::Cancelled) => return Err(SkillError::Cancelled),
                Err(err) => {
                    errors.push(format!(
                        "Failed to place {furnace} at ({}, {}): {err}",
                        at.x, at.y
                    ));
                    continue;
                }
            }

            let inserter = self.place_inserter(ctx, feed, facing).await;
            match inserter {
                Ok(true) => placed.push(format!("inserter at ({}, {})", feed.x, feed.y)),
                Ok(false) => errors.push(format!(
                    "Cannot place inserter at ({}, {})",
                    feed.x, feed.y
                )),
                Err(SkillError::Cancelled) => return Err(SkillError::Cancelled),
                Err(err) => errors.push(format!(
                    "Failed to place inserter at ({}, {}): {err}",
                    feed.x, feed.y
                )),
            }
        }

        debug!(entity_id = id, placed = placed.len(), errors = errors.len(), "smelter line done");
        if placed.is_empty() {
            let message = format!("Failed to build smelter line: {}", errors.join("; "));
            ctx.say(&message).await?;
            return Err(SkillError::Command(message));
        }

        let mut message = format!("Built smelter line: {} entities placed", placed.len());
        if !errors.is_empty() {
            message.push_str(&format!(", {} errors", errors.len()));
        }
        ctx.say(&message).await?;
        Ok(message)
    }

    async fn place_inserter<C: CommandSender>(
        &self,
        ctx: &SkillContext<C>,
        at: Position,
        facing: u8,
    ) -> Result<bool> {
        let id = ctx.companion_id();
        let check = ctx
            .exec_strict(&format!(
                "/fac_building_can_place {id} inserter {} {} {facing}",
                at.x, at.y
            ))
            .await?;
        if !can_place(&check) {
            return Ok(false);
        }
        ctx.exec_strict(&format!(
            "/fac_building_place {id} inserter {} {} {facing}",
            at.x, at.y
        ))
        .await?;
        Ok(true)
    }
}

fn can_place(check: &Value) -> bool {
    check.get("can_place").and_then(Value::as_bool) == Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(args: &[&str]) -> Result<BuildSmelterLine> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        BuildSmelterLine::from_positional(&args)
    }

    #[test]
    fn horizontal_left_fed_layout() {
        let plan = plan(&["1", "10", "20", "3", "stone-furnace", "horizontal", "left"]).unwrap();
        let (furnace, inserter) = plan.slot(2);
        assert_eq!(furnace, Position::new(14.0, 20.0));
        assert_eq!(inserter, Position::new(13.0, 20.0));
        assert_eq!(plan.input_side.inserter_direction(), 1);
    }

    #[test]
    fn vertical_top_fed_layout() {
        let plan = plan(&["1", "0", "0", "2", "steel-furnace", "vertical", "top"]).unwrap();
        let (furnace, inserter) = plan.slot(1);
        assert_eq!(furnace, Position::new(0.0, 2.0));
        assert_eq!(inserter, Position::new(0.0, 1.0));
        assert_eq!(plan.input_side.inserter_direction(), 2);
    }

    #[test]
    fn rejects_unknown_furnace() {
        let err = plan(&["1", "0", "0", "2", "blast-furnace", "vertical", "top"]).unwrap_err();
        assert!(matches!(err, SkillError::InvalidArgument { param: "furnaceType", .. }));
    }

    #[test]
    fn rejects_unknown_side() {
        let err = plan(&["1", "0", "0", "2", "stone-furnace", "vertical", "up"]).unwrap_err();
        assert!(matches!(err, SkillError::InvalidArgument { param: "inputSide", .. }));
    }
}
