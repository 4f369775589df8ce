use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Result, SealError};

use super::{collect_artifacts, CompileOutcome, CompileRequest, ExtensionCompiler};

// Everything the driver imports. Running this alone is the availability check,
// so a missing setup backend fails before any file is written.
macro_rules! toolchain_imports {
    () => {
        r#"
import json
import sys

try:
    from setuptools import setup
except ImportError:
    from distutils.core import setup
from Cython.Build import cythonize
from Cython.Distutils import build_ext
"#
    };
}

const TOOLCHAIN_CHECK: &str = toolchain_imports!();

/// setuptools driver run by the interpreter. Reads a [`CompileRequest`] as JSON
/// from stdin.
const DRIVER: &str = concat!(
    toolchain_imports!(),
    r#"
request = json.load(sys.stdin)
setup(
    ext_modules=cythonize(request["modules"], compiler_directives=request["directives"]),
    cmdclass={"build_ext": build_ext},
    script_args=["build_ext", "-b", request["build_dir"], "-t", request["temp_dir"]],
)
"#
);

/// Compiles modules with Cython through a Python interpreter
pub struct CythonCompiler {
    python: String,
}

impl CythonCompiler {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    pub fn python(&self) -> &str {
        &self.python
    }
}

impl ExtensionCompiler for CythonCompiler {
    fn name(&self) -> &str {
        "cython"
    }

    fn ensure_available(&self) -> Result<()> {
        let output = Command::new(&self.python)
            .arg("-c")
            .arg(TOOLCHAIN_CHECK)
            .output()
            .map_err(|e| {
                SealError::MissingToolchain(format!("Failed to run {}: {}", self.python, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(SealError::MissingToolchain(format!(
                "You don't seem to have Cython and setuptools installed for {}. Please install them first ({})",
                self.python,
                reason.trim()
            )));
        }

        Ok(())
    }

    fn compile(&self, request: &CompileRequest) -> Result<CompileOutcome> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.python)
            .arg("-c")
            .arg(DRIVER)
            .current_dir(&request.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SealError::MissingToolchain(format!("Failed to run {}: {}", self.python, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload)?;
        }

        let output = child.wait_with_output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            debug!("{}: {}", self.name(), line);
        }

        if !output.status.success() {
            return Err(SealError::CompileFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(CompileOutcome {
            artifacts: collect_artifacts(&request.build_dir)?,
        })
    }
}
