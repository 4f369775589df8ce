//! Extension module compilers.
//!
//! The transformer only sees [`ExtensionCompiler`]: a list of source files and a
//! directive map go in, compiled artifacts under the build directory come out.

pub mod cython;

pub use cython::CythonCompiler;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::config::Directive;
use crate::error::Result;

/// File extensions of compiled Python extension modules
pub const ARTIFACT_EXTENSIONS: &[&str] = &["so", "pyd"];

/// Input of one compile call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileRequest {
    /// Directory the compiler runs in (the project root)
    pub working_dir: PathBuf,
    pub modules: Vec<PathBuf>,
    pub directives: BTreeMap<String, Directive>,
    pub build_dir: PathBuf,
    pub temp_dir: PathBuf,
}

/// Result of a successful compile call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutcome {
    pub artifacts: Vec<PathBuf>,
}

pub trait ExtensionCompiler {
    /// Short name used in log and progress messages
    fn name(&self) -> &str;

    /// Fails with [`SealError::MissingToolchain`](crate::SealError::MissingToolchain)
    /// when the toolchain cannot be used.
    fn ensure_available(&self) -> Result<()>;

    fn compile(&self, request: &CompileRequest) -> Result<CompileOutcome>;
}

/// Lists compiled extension modules under `build_dir`, sorted by path.
pub fn collect_artifacts(build_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut artifacts = Vec::new();
    if !build_dir.is_dir() {
        return Ok(artifacts);
    }

    for entry in WalkDir::new(build_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_artifact = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| ARTIFACT_EXTENSIONS.contains(&e));
        if is_artifact {
            artifacts.push(entry.into_path());
        }
    }

    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let build = temp_dir.path().join("build");
        fs::create_dir_all(build.join("pkg")).unwrap();
        fs::write(build.join("pkg/mod.cpython-311-x86_64-linux-gnu.so"), "").unwrap();
        fs::write(build.join("pkg/win.cp311-win_amd64.pyd"), "").unwrap();
        fs::write(build.join("pkg/__init__.py"), "").unwrap();
        fs::write(build.join("pkg/data.txt"), "").unwrap();

        let artifacts = collect_artifacts(&build).unwrap();
        assert_eq!(
            artifacts,
            vec![
                build.join("pkg/mod.cpython-311-x86_64-linux-gnu.so"),
                build.join("pkg/win.cp311-win_amd64.pyd"),
            ]
        );
    }

    #[test]
    fn test_collect_artifacts_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let artifacts = collect_artifacts(&temp_dir.path().join("nope")).unwrap();
        assert!(artifacts.is_empty());
    }

    #[test]
    fn test_request_serializes_for_driver() {
        let request = CompileRequest {
            working_dir: PathBuf::from("/src"),
            modules: vec![PathBuf::from("/src/pkg/mod.py")],
            directives: crate::config::default_directives(),
            build_dir: PathBuf::from("/src/build"),
            temp_dir: PathBuf::from("/src/build/temp"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["modules"][0], "/src/pkg/mod.py");
        assert_eq!(json["build_dir"], "/src/build");
        assert_eq!(json["temp_dir"], "/src/build/temp");
        assert_eq!(json["directives"]["language_level"], 3);
    }
}
