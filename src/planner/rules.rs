use std::collections::HashSet;
use std::path::Path;

use glob::Pattern;
use serde::Serialize;

use crate::config::BuildConfig;
use crate::error::Result;

/// What happens to a single file during a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    /// Compiled into an extension module
    Compile,
    /// Compiled, and also copied verbatim (package marker files)
    CompileAndCopy,
    /// Copied verbatim into the build tree
    Copy,
    /// Left out of the build entirely
    Skip,
}

impl FileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Compile => "compile",
            FileAction::CompileAndCopy => "compile+copy",
            FileAction::Copy => "copy",
            FileAction::Skip => "skip",
        }
    }

    pub fn compiles(&self) -> bool {
        matches!(self, FileAction::Compile | FileAction::CompileAndCopy)
    }

    pub fn copies(&self) -> bool {
        matches!(self, FileAction::Copy | FileAction::CompileAndCopy)
    }
}

/// Exclusion rules compiled from a [`BuildConfig`].
///
/// All checks work on bare file or directory names and have no side effects.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    exclude_dirs: HashSet<String>,
    exclude_files: Vec<Pattern>,
    skip_files: HashSet<String>,
    intermediates: Vec<Pattern>,
    marker_file: String,
    source_extension: String,
}

impl ExclusionRules {
    pub fn from_config(config: &BuildConfig) -> Result<Self> {
        Ok(Self {
            exclude_dirs: config.exclude_dirs.iter().cloned().collect(),
            exclude_files: compile_patterns(&config.exclude_files)?,
            skip_files: config.skip_files.iter().cloned().collect(),
            intermediates: compile_patterns(&config.intermediate_patterns)?,
            marker_file: config.marker_file.clone(),
            source_extension: config.source_extension.clone(),
        })
    }

    pub fn marker_file(&self) -> &str {
        &self.marker_file
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.contains(name)
    }

    pub fn is_excluded_file(&self, name: &str) -> bool {
        self.exclude_files.iter().any(|p| p.matches(name))
    }

    pub fn is_skipped(&self, name: &str) -> bool {
        self.skip_files.contains(name)
    }

    pub fn is_intermediate(&self, name: &str) -> bool {
        self.intermediates.iter().any(|p| p.matches(name))
    }

    pub fn is_source(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == self.source_extension)
    }

    pub fn classify(&self, name: &str) -> FileAction {
        if self.is_skipped(name) {
            return FileAction::Skip;
        }

        if self.is_source(name) {
            if self.is_excluded_file(name) {
                FileAction::Copy
            } else if name == self.marker_file {
                FileAction::CompileAndCopy
            } else {
                FileAction::Compile
            }
        } else if self.is_excluded_file(name) {
            FileAction::Skip
        } else {
            FileAction::Copy
        }
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(Into::into))
        .collect()
}
