use std::path::{Path, PathBuf};

use ignore::{DirEntry, WalkBuilder};

use crate::error::Result;

use super::rules::ExclusionRules;

/// A directory or file reached by [`TreeWalker::walk`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub depth: usize,
    /// Also set for a symlink to a directory
    pub is_dir: bool,
    /// The entry is a symlink. Linked directories are listed but never entered.
    pub is_symlink: bool,
}

/// Top-down walk over a source tree with excluded directories pruned.
pub struct TreeWalker {
    rules: ExclusionRules,
    prune: Vec<PathBuf>,
    respect_gitignore: bool,
}

impl TreeWalker {
    pub fn new(rules: ExclusionRules) -> Self {
        Self {
            rules,
            prune: Vec::new(),
            respect_gitignore: false,
        }
    }

    /// Never descend into `path`, whatever its name.
    pub fn prune(mut self, path: impl Into<PathBuf>) -> Self {
        self.prune.push(path.into());
        self
    }

    pub fn respect_gitignore(mut self, yes: bool) -> Self {
        self.respect_gitignore = yes;
        self
    }

    /// Returns every entry below `root` (the root itself excluded), parents
    /// before children and siblings in file name order.
    pub fn walk(&self, root: &Path) -> Result<Vec<WalkEntry>> {
        let rules = self.rules.clone();
        let prune = self.prune.clone();

        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .git_ignore(self.respect_gitignore)
            .require_git(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                if !is_dir_entry(entry) {
                    return true;
                }
                if prune.iter().any(|p| p == entry.path()) {
                    return false;
                }
                entry
                    .file_name()
                    .to_str()
                    .map_or(true, |name| !rules.is_excluded_dir(name))
            })
            .build();

        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry?;
            if entry.depth() == 0 {
                continue;
            }
            entries.push(WalkEntry {
                is_dir: is_dir_entry(&entry),
                is_symlink: entry.path_is_symlink(),
                depth: entry.depth(),
                path: entry.into_path(),
            });
        }

        Ok(entries)
    }
}

// With `follow_links(false)` a linked directory reports a symlink file type.
fn is_dir_entry(entry: &DirEntry) -> bool {
    match entry.file_type() {
        Some(ft) if ft.is_dir() => true,
        Some(ft) if ft.is_symlink() => entry.path().is_dir(),
        _ => false,
    }
}
