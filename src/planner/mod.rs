pub mod plan;
pub mod rules;
pub mod walker;

pub use plan::{BuildPlan, PlannedFile, Planner};
pub use rules::{ExclusionRules, FileAction};
pub use walker::{TreeWalker, WalkEntry};
