//! Build configuration.
//!
//! Every policy knob of a build lives in [`BuildConfig`]: which directories and
//! files are excluded, where the build output goes, whether the original
//! sources are destroyed afterwards and which directives the compiler gets.
//!
//! Configuration is looked up in this order (see [`loader::load_config`]):
//! ```text
//! --config FILE            explicit YAML file
//! <root>/.pyseal.yml       sidecar YAML file
//! <root>/pyproject.toml    [tool.pyseal] table
//! built-in defaults
//! ```

pub mod loader;

pub use loader::{load_config, parse_pyproject, parse_yaml, ConfigSource, CONFIG_FILENAME};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SealError};

/// A single Cython compiler directive value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Directive {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Settings for one build run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root. Set by the loader, never read from a file.
    #[serde(skip)]
    pub root: PathBuf,

    /// Name of the build output directory, created directly under the root
    pub build_dir: String,

    /// Name of the compiler scratch directory, created under the build directory
    pub temp_dir: String,

    /// File that makes a directory an importable package
    pub marker_file: String,

    /// Extension (without the dot) of files that get compiled
    pub source_extension: String,

    /// Directory names that are never visited
    pub exclude_dirs: Vec<String>,

    /// File name glob patterns that are never compiled
    pub exclude_files: Vec<String>,

    /// Exact file names that are neither compiled nor copied
    pub skip_files: Vec<String>,

    /// Glob patterns of compiler leftovers removed after a successful build
    pub intermediate_patterns: Vec<String>,

    /// Delete everything except the build directory after a successful build
    pub suicide: bool,

    /// Skip files ignored by `.gitignore`
    pub respect_gitignore: bool,

    /// Python interpreter used to drive Cython
    pub python: String,

    /// Cython compiler directives
    pub directives: BTreeMap<String, Directive>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            build_dir: "build".to_string(),
            temp_dir: "temp".to_string(),
            marker_file: "__init__.py".to_string(),
            source_extension: "py".to_string(),
            exclude_dirs: to_strings(&[".git", "__pycache__", "test", "logs", "venv", ".idea"]),
            exclude_files: to_strings(&[
                "*.md",
                ".gitignore",
                ".python-version",
                "requirements.txt",
                "*.pyc",
                "*.c",
            ]),
            skip_files: to_strings(&["build_it.py"]),
            intermediate_patterns: to_strings(&["*.c"]),
            suicide: false,
            respect_gitignore: false,
            python: "python3".to_string(),
            directives: default_directives(),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Directives passed to `cythonize` unless the config overrides them
pub fn default_directives() -> BTreeMap<String, Directive> {
    let mut directives = BTreeMap::new();
    directives.insert("always_allow_keywords".to_string(), Directive::Bool(true));
    directives.insert(
        "c_string_encoding".to_string(),
        Directive::Str("utf-8".to_string()),
    );
    directives.insert("language_level".to_string(), Directive::Int(3));
    directives
}

impl BuildConfig {
    /// Default configuration rooted at `root`
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn build_path(&self) -> PathBuf {
        self.root.join(&self.build_dir)
    }

    pub fn temp_path(&self) -> PathBuf {
        self.build_path().join(&self.temp_dir)
    }

    /// Checks values that would otherwise fail halfway through a build.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("build_dir", &self.build_dir),
            ("temp_dir", &self.temp_dir),
            ("marker_file", &self.marker_file),
        ] {
            if !is_plain_name(value) {
                return Err(SealError::Config(format!(
                    "{} must be a single path component, got {:?}",
                    field, value
                )));
            }
        }

        if self.source_extension.is_empty() || self.source_extension.starts_with('.') {
            return Err(SealError::Config(format!(
                "source_extension must be a bare extension like \"py\", got {:?}",
                self.source_extension
            )));
        }

        if self.python.trim().is_empty() {
            return Err(SealError::Config("python must not be empty".to_string()));
        }

        Ok(())
    }
}

fn is_plain_name(value: &str) -> bool {
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}
