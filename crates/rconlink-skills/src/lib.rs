//! Skill lifecycle management.
//!
//! A skill is a multi-step routine that drives one companion through
//! repeated console commands. [`SkillManager`] runs each skill as a tokio
//! task with its own cancellation token and guarantees that a companion has
//! at most one tracked skill at any time.

pub mod context;
pub mod error;
pub mod manager;
pub mod routines;

pub use context::{Position, RoutineTiming, SkillContext};
pub use error::{Result, SkillError};
pub use manager::{
    ClearedCommand, LocalStatus, SkillInfo, SkillManager, SkillStatus, StopReport, CLEAR_SEQUENCE,
};
pub use routines::{run_routine, RoutinePlan};
