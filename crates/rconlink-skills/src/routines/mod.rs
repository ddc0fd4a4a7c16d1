//! Skill routines. Each one talks to the world only through console
//! commands issued via its [`SkillContext`].

pub mod build_smelter_line;
pub mod combat_until;
pub mod mine_until;

use rconlink_client::CommandSender;
use rconlink_registry::RoutineRef;

use crate::context::SkillContext;
use crate::error::Result;

pub use build_smelter_line::BuildSmelterLine;
pub use combat_until::CombatUntil;
pub use mine_until::MineUntil;

/// A routine with its arguments parsed, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutinePlan {
    MineUntil(MineUntil),
    CombatUntil(CombatUntil),
    BuildSmelterLine(BuildSmelterLine),
}

impl RoutinePlan {
    /// Parse positional values; index 0 is always the companion id.
    pub fn parse(routine: RoutineRef, args: &[String]) -> Result<Self> {
        Ok(match routine {
            RoutineRef::MineUntil => Self::MineUntil(MineUntil::from_positional(args)?),
            RoutineRef::CombatUntil => Self::CombatUntil(CombatUntil::from_positional(args)?),
            RoutineRef::BuildSmelterLine => {
                Self::BuildSmelterLine(BuildSmelterLine::from_positional(args)?)
            }
        })
    }

    /// Run to completion and return a one-line summary.
    pub async fn run<C: CommandSender>(&self, ctx: &SkillContext<C>) -> Result<String> {
        match self {
            Self::MineUntil(plan) => plan.run(ctx).await,
            Self::CombatUntil(plan) => plan.run(ctx).await,
            Self::BuildSmelterLine(plan) => plan.run(ctx).await,
        }
    }
}

/// Parse and run `routine` in one step.
pub async fn run_routine<C: CommandSender>(
    routine: RoutineRef,
    ctx: &SkillContext<C>,
    args: &[String],
) -> Result<String> {
    RoutinePlan::parse(routine, args)?.run(ctx).await
}
