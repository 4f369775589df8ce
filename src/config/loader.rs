use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SealError};

use super::BuildConfig;

/// Name of the sidecar config file looked up in the project root
pub const CONFIG_FILENAME: &str = ".pyseal.yml";

const PYPROJECT_FILENAME: &str = "pyproject.toml";

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Sidecar(PathBuf),
    Pyproject(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn describe(&self) -> String {
        match self {
            ConfigSource::File(path) => format!("config file {}", path.display()),
            ConfigSource::Sidecar(path) => format!("sidecar {}", path.display()),
            ConfigSource::Pyproject(path) => format!("[tool.pyseal] in {}", path.display()),
            ConfigSource::Defaults => "built-in defaults".to_string(),
        }
    }
}

/// Parses a YAML config document. An empty document yields the defaults.
pub fn parse_yaml(content: &str) -> Result<BuildConfig> {
    if content.trim().is_empty() {
        return Ok(BuildConfig::default());
    }
    serde_yaml::from_str(content)
        .map_err(|e| SealError::Config(format!("Invalid config YAML: {}", e)))
}

/// Reads the `[tool.pyseal]` table of a pyproject.toml, if there is one.
pub fn parse_pyproject(content: &str) -> Result<Option<BuildConfig>> {
    let doc: toml::Value = content
        .parse()
        .map_err(|e: toml::de::Error| SealError::Config(format!("Invalid pyproject.toml: {}", e)))?;

    let Some(section) = doc.get("tool").and_then(|tool| tool.get("pyseal")) else {
        return Ok(None);
    };

    let config = section
        .clone()
        .try_into::<BuildConfig>()
        .map_err(|e| SealError::Config(format!("Invalid [tool.pyseal] table: {}", e)))?;
    Ok(Some(config))
}

/// Resolves the configuration for `root`.
///
/// The returned config has `root` set. A YAML config file that lives directly
/// in the root is added to `skip_files` so it never ends up in the build output.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<(BuildConfig, ConfigSource)> {
    let (mut config, source) = if let Some(path) = explicit {
        let content = fs::read_to_string(path).map_err(|e| {
            SealError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        (parse_yaml(&content)?, ConfigSource::File(path.to_path_buf()))
    } else if root.join(CONFIG_FILENAME).is_file() {
        let path = root.join(CONFIG_FILENAME);
        let content = fs::read_to_string(&path)?;
        (parse_yaml(&content)?, ConfigSource::Sidecar(path))
    } else if let Some((config, path)) = load_pyproject(root)? {
        (config, ConfigSource::Pyproject(path))
    } else {
        (BuildConfig::default(), ConfigSource::Defaults)
    };

    config.root = root.to_path_buf();

    if let ConfigSource::File(path) | ConfigSource::Sidecar(path) = &source {
        if lives_in(path, root) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !config.skip_files.iter().any(|s| s == name) {
                    config.skip_files.push(name.to_string());
                }
            }
        }
    }

    config.validate()?;
    tracing::debug!("Loaded configuration from {}", source.describe());

    Ok((config, source))
}

fn load_pyproject(root: &Path) -> Result<Option<(BuildConfig, PathBuf)>> {
    let path = root.join(PYPROJECT_FILENAME);
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    Ok(parse_pyproject(&content)?.map(|config| (config, path)))
}

fn lives_in(file: &Path, dir: &Path) -> bool {
    let (Ok(file), Ok(dir)) = (fs::canonicalize(file), fs::canonicalize(dir)) else {
        return false;
    };
    file.parent() == Some(dir.as_path())
}
