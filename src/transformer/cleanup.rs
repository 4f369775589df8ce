use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;
use crate::planner::ExclusionRules;

/// Removes the compiler scratch directory. Returns whether it existed.
pub fn remove_temp_dir(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(path)?;
    Ok(true)
}

/// Deletes compiler leftovers (`*.c` by default) under `root`, skipping
/// excluded directories.
pub fn remove_intermediates(root: &Path, rules: &ExclusionRules) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || entry
                    .file_name()
                    .to_str()
                    .map_or(true, |name| !rules.is_excluded_dir(name))
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_intermediate = entry
            .file_name()
            .to_str()
            .is_some_and(|name| rules.is_intermediate(name));
        if is_intermediate {
            debug!("Removing intermediate {}", entry.path().display());
            fs::remove_file(entry.path())?;
            removed.push(entry.into_path());
        }
    }

    Ok(removed)
}

/// Deletes every entry directly under `root` except `keep`.
pub fn destroy_sources(root: &Path, keep: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if path == keep {
            continue;
        }
        if entry.file_type().is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        removed.push(entry.into_path());
    }

    Ok(removed)
}
