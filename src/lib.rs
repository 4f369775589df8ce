pub mod compiler;
pub mod config;
pub mod error;
pub mod planner;
pub mod transformer;

pub use compiler::{
    collect_artifacts, CompileOutcome, CompileRequest, CythonCompiler, ExtensionCompiler,
};
pub use config::{load_config, BuildConfig, ConfigSource, Directive};
pub use error::{Result, SealError};
pub use planner::{BuildPlan, ExclusionRules, FileAction, PlannedFile, Planner, TreeWalker};
pub use transformer::{BuildReport, Transformer};
