//! The tree transformer: plan, apply, compile, clean up and optionally
//! destroy the original sources.

pub mod cleanup;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::compiler::{CompileRequest, ExtensionCompiler};
use crate::config::BuildConfig;
use crate::error::{Result, SealError};
use crate::planner::{BuildPlan, ExclusionRules, Planner};

/// What a finished build did
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub build_dir: PathBuf,
    pub markers_created: Vec<PathBuf>,
    pub dirs_created: usize,
    pub files_copied: usize,
    pub modules_compiled: usize,
    pub artifacts: Vec<PathBuf>,
    pub intermediates_removed: Vec<PathBuf>,
    pub sources_destroyed: Vec<PathBuf>,
    pub elapsed_ms: u64,
}

pub struct Transformer {
    config: BuildConfig,
    rules: ExclusionRules,
}

impl Transformer {
    /// Validates `config` and resolves its root to an absolute path.
    pub fn new(mut config: BuildConfig) -> Result<Self> {
        config.validate()?;
        config.root = fs::canonicalize(&config.root)?;
        let rules = ExclusionRules::from_config(&config)?;
        Ok(Self { config, rules })
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// The build output must always be created fresh.
    pub fn check_preconditions(&self) -> Result<()> {
        let build_dir = self.config.build_path();
        if build_dir.exists() {
            return Err(SealError::BuildDirExists(build_dir));
        }
        Ok(())
    }

    /// Inspects the source tree without touching it.
    pub fn plan(&self) -> Result<BuildPlan> {
        Planner::new(&self.config, &self.rules).plan()
    }

    /// Runs a full build. Nothing after the compile step runs if it fails.
    pub fn run(&self, compiler: &dyn ExtensionCompiler) -> Result<BuildReport> {
        let started = Instant::now();

        compiler.ensure_available()?;
        self.check_preconditions()?;

        let plan = self.plan()?;
        info!(
            "Planned {} modules, {} copies, {} directories",
            plan.modules().len(),
            plan.copies().len(),
            plan.dirs.len()
        );
        plan.apply()?;

        let request = CompileRequest {
            working_dir: self.config.root.clone(),
            modules: plan.modules(),
            directives: self.config.directives.clone(),
            build_dir: self.config.build_path(),
            temp_dir: self.config.temp_path(),
        };
        info!(
            "Compiling {} modules with {}",
            request.modules.len(),
            compiler.name()
        );
        let outcome = compiler.compile(&request)?;

        cleanup::remove_temp_dir(&request.temp_dir)?;
        let intermediates_removed = cleanup::remove_intermediates(&self.config.root, &self.rules)?;

        let sources_destroyed = if self.config.suicide {
            warn!(
                "Suicide mode: deleting everything in {} except {}",
                self.config.root.display(),
                self.config.build_dir
            );
            cleanup::destroy_sources(&self.config.root, &request.build_dir)?
        } else {
            Vec::new()
        };

        Ok(BuildReport {
            build_dir: request.build_dir,
            markers_created: plan.markers.clone(),
            dirs_created: plan.dirs.len(),
            files_copied: plan.copies().len(),
            modules_compiled: request.modules.len(),
            artifacts: outcome.artifacts,
            intermediates_removed,
            sources_destroyed,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}
