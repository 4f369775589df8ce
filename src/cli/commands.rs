use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use pyseal::compiler::{CompileOutcome, CompileRequest, CythonCompiler, ExtensionCompiler};
use pyseal::config::{load_config, BuildConfig};
use pyseal::error::Result;
use pyseal::planner::{BuildPlan, FileAction};
use pyseal::transformer::Transformer;

#[derive(Parser)]
#[command(name = "pyseal")]
#[command(about = "Compile a Python source tree into Cython extension modules")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Compile the current directory into ./build
    pyseal build

    # Show what would be compiled, copied and skipped
    pyseal plan ./service

    # Compile and delete the original sources afterwards
    pyseal build ./service --suicide

    Sources are only deleted when --suicide is given or the config sets
    `suicide: true`. It is off by default.

    # Check that Cython is installed for a given interpreter
    pyseal check --python python3.11
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a source tree
    Build {
        /// Project root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// YAML config file (defaults to .pyseal.yml or [tool.pyseal] in pyproject.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Name of the build output directory
        #[arg(long)]
        build_dir: Option<String>,

        /// Delete everything except the build directory after a successful build
        #[arg(long)]
        suicide: bool,

        /// Skip files ignored by .gitignore
        #[arg(long)]
        respect_gitignore: bool,

        /// Python interpreter with Cython installed
        #[arg(long)]
        python: Option<String>,

        /// Print the plan without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show how each file would be handled
    Plan {
        /// Project root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// YAML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Check that the compiler toolchain is available
    Check {
        /// Project root, used to find the configured interpreter
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Python interpreter with Cython installed
        #[arg(long)]
        python: Option<String>,
    },
}

/// Overrides applied on top of the loaded configuration
#[derive(Default)]
pub struct BuildOverrides {
    pub build_dir: Option<String>,
    pub suicide: bool,
    pub respect_gitignore: bool,
    pub python: Option<String>,
}

fn resolve_config(
    path: &Path,
    config_file: Option<&Path>,
    overrides: BuildOverrides,
) -> Result<BuildConfig> {
    let (mut config, source) = load_config(path, config_file)?;
    tracing::info!("Using {}", source.describe());

    if let Some(build_dir) = overrides.build_dir {
        config.build_dir = build_dir;
    }
    if overrides.suicide {
        config.suicide = true;
    }
    if overrides.respect_gitignore {
        config.respect_gitignore = true;
    }
    if let Some(python) = overrides.python {
        config.python = python;
    }

    Ok(config)
}

/// Wraps a compiler with a terminal spinner.
struct SpinnerCompiler<C> {
    inner: C,
}

impl<C: ExtensionCompiler> ExtensionCompiler for SpinnerCompiler<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn ensure_available(&self) -> Result<()> {
        self.inner.ensure_available()
    }

    fn compile(&self, request: &CompileRequest) -> Result<CompileOutcome> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(format!(
            "Compiling {} modules with {}...",
            request.modules.len(),
            self.inner.name()
        ));

        let result = self.inner.compile(request);
        match &result {
            Ok(outcome) => spinner.finish_with_message(format!(
                "Compiled {} extension modules",
                outcome.artifacts.len()
            )),
            Err(_) => spinner.finish_with_message("Compilation failed"),
        }
        result
    }
}

pub fn build(
    path: &Path,
    config_file: Option<&Path>,
    overrides: BuildOverrides,
    dry_run: bool,
) -> Result<()> {
    let config = resolve_config(path, config_file, overrides)?;
    let transformer = Transformer::new(config)?;

    if dry_run {
        if let Err(e) = transformer.check_preconditions() {
            eprintln!("Warning: {}", e);
        }
        let plan = transformer.plan()?;
        print_plan(&plan);
        return Ok(());
    }

    let compiler = SpinnerCompiler {
        inner: CythonCompiler::new(transformer.config().python.clone()),
    };
    let report = transformer.run(&compiler)?;

    for marker in &report.markers_created {
        println!("Created empty package marker {}", marker.display());
    }
    println!(
        "Compiled {} modules ({} artifacts), copied {} files into {} ({} directories)",
        report.modules_compiled,
        report.artifacts.len(),
        report.files_copied,
        report.build_dir.display(),
        report.dirs_created
    );
    if !report.intermediates_removed.is_empty() {
        println!(
            "Removed {} intermediate files",
            report.intermediates_removed.len()
        );
    }
    if !report.sources_destroyed.is_empty() {
        println!(
            "\nWARNING: Deleted {} entries outside {}",
            report.sources_destroyed.len(),
            report.build_dir.display()
        );
    }

    println!(
        "\nCompile finished!  cost time: {:.3}s",
        report.elapsed_ms as f64 / 1000.0
    );

    Ok(())
}

pub fn plan(path: &Path, config_file: Option<&Path>, format: &str) -> Result<()> {
    let config = resolve_config(path, config_file, BuildOverrides::default())?;
    let transformer = Transformer::new(config)?;
    let plan = transformer.plan()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }

    Ok(())
}

pub fn check(path: &Path, python: Option<String>) -> Result<()> {
    let config = resolve_config(
        path,
        None,
        BuildOverrides {
            python,
            ..Default::default()
        },
    )?;

    let compiler = CythonCompiler::new(config.python);
    compiler.ensure_available()?;
    println!("Cython is available for {}", compiler.python());

    Ok(())
}

fn print_plan(plan: &BuildPlan) {
    println!("Root: {}", plan.root.display());
    println!("Build directory: {}", plan.build_dir.display());

    if !plan.markers.is_empty() {
        println!("\nMissing package markers (will be created):");
        for marker in &plan.markers {
            println!("  {}", marker.display());
        }
    }

    if !plan.dirs.is_empty() {
        println!("\nDirectories:");
        for dir in &plan.dirs {
            println!("  {}/", dir.display());
        }
    }

    println!("\nFiles:");
    for file in &plan.files {
        println!("  {:<12} {}", file.action.as_str(), file.relative.display());
    }

    let count = |action: FileAction| plan.files.iter().filter(|f| f.action == action).count();
    println!(
        "\n{} to compile, {} to compile and copy, {} to copy, {} skipped, {} directories",
        count(FileAction::Compile),
        count(FileAction::CompileAndCopy),
        count(FileAction::Copy),
        plan.skipped().len(),
        plan.dirs.len()
    );
}
