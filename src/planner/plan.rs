use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::BuildConfig;
use crate::error::{Result, SealError};

use super::rules::{ExclusionRules, FileAction};
use super::walker::TreeWalker;

/// One classified file of the source tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFile {
    pub source: PathBuf,
    /// Path relative to the root, which is also its path inside the build directory
    pub relative: PathBuf,
    pub action: FileAction,
}

/// Everything a build will do to the filesystem, computed without writing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildPlan {
    pub root: PathBuf,
    pub build_dir: PathBuf,
    /// Mirrored directories, relative to the build directory. Empty ones included.
    pub dirs: Vec<PathBuf>,
    /// Package marker files missing from the source tree
    pub markers: Vec<PathBuf>,
    pub files: Vec<PlannedFile>,
}

impl BuildPlan {
    /// Source files to hand to the compiler, in walk order.
    pub fn modules(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|f| f.action.compiles())
            .map(|f| f.source.clone())
            .collect()
    }

    /// `(source, destination)` pairs copied verbatim.
    pub fn copies(&self) -> Vec<(PathBuf, PathBuf)> {
        self.files
            .iter()
            .filter(|f| f.action.copies())
            .map(|f| (f.source.clone(), self.build_dir.join(&f.relative)))
            .collect()
    }

    pub fn skipped(&self) -> Vec<&Path> {
        self.files
            .iter()
            .filter(|f| f.action == FileAction::Skip)
            .map(|f| f.source.as_path())
            .collect()
    }

    /// Performs the plan: markers first, then the build skeleton, then copies.
    pub fn apply(&self) -> Result<()> {
        for marker in &self.markers {
            warn!("Creating empty package marker {}", marker.display());
            OpenOptions::new().create(true).append(true).open(marker)?;
        }

        fs::create_dir(&self.build_dir)?;
        for dir in &self.dirs {
            fs::create_dir_all(self.build_dir.join(dir))?;
        }

        for (source, dest) in self.copies() {
            debug!("Copying {} -> {}", source.display(), dest.display());
            fs::copy(&source, &dest)?;
        }

        Ok(())
    }
}

/// Builds a [`BuildPlan`] by inspecting the source tree.
pub struct Planner<'a> {
    config: &'a BuildConfig,
    rules: &'a ExclusionRules,
}

impl<'a> Planner<'a> {
    pub fn new(config: &'a BuildConfig, rules: &'a ExclusionRules) -> Self {
        Self { config, rules }
    }

    pub fn plan(&self) -> Result<BuildPlan> {
        let root = &self.config.root;
        let build_dir = self.config.build_path();
        let mut plan = BuildPlan {
            root: root.clone(),
            build_dir: build_dir.clone(),
            ..Default::default()
        };

        let walker = TreeWalker::new(self.rules.clone())
            .prune(build_dir)
            .respect_gitignore(self.config.respect_gitignore);

        for entry in walker.walk(root)? {
            let relative = entry
                .path
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path.clone());

            if entry.is_dir && entry.is_symlink {
                debug!("Mirroring linked directory {} without entering it", entry.path.display());
                plan.dirs.push(relative);
                continue;
            }

            if entry.is_dir {
                let marker = entry.path.join(self.rules.marker_file());
                if !marker.is_file() {
                    plan.files.push(PlannedFile {
                        source: marker.clone(),
                        relative: relative.join(self.rules.marker_file()),
                        action: self.rules.classify(self.rules.marker_file()),
                    });
                    plan.markers.push(marker);
                }
                plan.dirs.push(relative);
                continue;
            }

            let Some(file_name) = entry.path.file_name() else {
                continue;
            };
            let action = self.rules.classify(&file_name.to_string_lossy());
            if action.compiles() && file_name.to_str().is_none() {
                return Err(SealError::NonUtf8Module(entry.path));
            }
            plan.files.push(PlannedFile {
                action,
                source: entry.path,
                relative,
            });
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn plan_for(root: &Path) -> BuildPlan {
        let config = BuildConfig::for_root(root);
        let rules = ExclusionRules::from_config(&config).unwrap();
        Planner::new(&config, &rules).plan().unwrap()
    }

    fn action_of(plan: &BuildPlan, relative: &str) -> Option<FileAction> {
        plan.files
            .iter()
            .find(|f| f.relative == Path::new(relative))
            .map(|f| f.action)
    }

    #[test]
    fn test_plan_classifies_package() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/__init__.py", "");
        create_file(temp_dir.path(), "pkg/mod.py", "x = 1");
        create_file(temp_dir.path(), "pkg/data.txt", "data");
        create_file(temp_dir.path(), "README.md", "# readme");

        let plan = plan_for(temp_dir.path());

        assert_eq!(action_of(&plan, "pkg/__init__.py"), Some(FileAction::CompileAndCopy));
        assert_eq!(action_of(&plan, "pkg/mod.py"), Some(FileAction::Compile));
        assert_eq!(action_of(&plan, "pkg/data.txt"), Some(FileAction::Copy));
        assert_eq!(action_of(&plan, "README.md"), Some(FileAction::Skip));
        assert_eq!(plan.dirs, vec![PathBuf::from("pkg")]);
        assert!(plan.markers.is_empty());
    }

    #[test]
    fn test_plan_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/sub/mod.py", "");

        let plan = plan_for(temp_dir.path());

        assert_eq!(plan.markers.len(), 2);
        assert!(!temp_dir.path().join("pkg/__init__.py").exists());
        assert!(!temp_dir.path().join("pkg/sub/__init__.py").exists());
        assert!(!temp_dir.path().join("build").exists());
    }

    #[test]
    fn test_plan_treats_missing_markers_as_present() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/mod.py", "");

        let plan = plan_for(temp_dir.path());
        let marker = temp_dir.path().join("pkg/__init__.py");

        assert_eq!(plan.markers, vec![marker.clone()]);
        assert!(plan.modules().contains(&marker));
        assert!(plan
            .copies()
            .contains(&(marker, temp_dir.path().join("build/pkg/__init__.py"))));
    }

    #[test]
    fn test_plan_no_marker_for_root() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "main.py", "");

        let plan = plan_for(temp_dir.path());
        assert!(plan.markers.is_empty());
        assert_eq!(plan.modules(), vec![temp_dir.path().join("main.py")]);
    }

    #[test]
    fn test_plan_keeps_empty_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("assets/empty")).unwrap();

        let plan = plan_for(temp_dir.path());
        assert_eq!(
            plan.dirs,
            vec![PathBuf::from("assets"), PathBuf::from("assets/empty")]
        );
    }

    #[test]
    fn test_plan_ignores_excluded_dirs() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "test/test_mod.py", "");
        create_file(temp_dir.path(), "pkg/__pycache__/mod.pyc", "");
        create_file(temp_dir.path(), "pkg/__init__.py", "");

        let plan = plan_for(temp_dir.path());
        assert_eq!(plan.dirs, vec![PathBuf::from("pkg")]);
        assert!(plan.markers.is_empty());
        assert!(plan.files.iter().all(|f| !f.relative.starts_with("test")));
    }

    #[test]
    fn test_apply_creates_markers_skeleton_and_copies() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/mod.py", "");
        create_file(temp_dir.path(), "pkg/data.txt", "payload");
        fs::create_dir_all(temp_dir.path().join("pkg/empty")).unwrap();

        let plan = plan_for(temp_dir.path());
        plan.apply().unwrap();

        let build = temp_dir.path().join("build");
        assert!(temp_dir.path().join("pkg/__init__.py").is_file());
        assert!(temp_dir.path().join("pkg/empty/__init__.py").is_file());
        assert!(build.join("pkg/empty").is_dir());
        assert!(build.join("pkg/__init__.py").is_file());
        assert!(build.join("pkg/empty/__init__.py").is_file());
        assert_eq!(fs::read_to_string(build.join("pkg/data.txt")).unwrap(), "payload");
        assert!(!build.join("pkg/mod.py").exists());
    }

    #[test]
    fn test_apply_keeps_existing_marker_content() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/__init__.py", "VERSION = '1.0'\n");

        let plan = plan_for(temp_dir.path());
        plan.apply().unwrap();

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("build/pkg/__init__.py")).unwrap(),
            "VERSION = '1.0'\n"
        );
    }

    #[test]
    fn test_apply_fails_when_build_dir_appears() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "main.py", "");

        let plan = plan_for(temp_dir.path());
        fs::create_dir(temp_dir.path().join("build")).unwrap();

        assert!(plan.apply().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_plan_copies_non_utf8_file_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"data-\xff.bin");
        fs::write(temp_dir.path().join(name), b"raw").unwrap();
        create_file(temp_dir.path(), "main.py", "");

        let plan = plan_for(temp_dir.path());
        let entry = plan
            .files
            .iter()
            .find(|f| f.relative == Path::new(name))
            .unwrap();
        assert_eq!(entry.action, FileAction::Copy);

        plan.apply().unwrap();
        assert_eq!(fs::read(temp_dir.path().join("build").join(name)).unwrap(), b"raw");
    }

    #[cfg(unix)]
    #[test]
    fn test_plan_rejects_non_utf8_module_before_writing() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/ok.py", "");
        fs::write(temp_dir.path().join(OsStr::from_bytes(b"mod-\xff.py")), b"").unwrap();

        let config = BuildConfig::for_root(temp_dir.path());
        let rules = ExclusionRules::from_config(&config).unwrap();
        let result = Planner::new(&config, &rules).plan();

        assert!(matches!(result, Err(SealError::NonUtf8Module(_))));
        assert!(!temp_dir.path().join("pkg/__init__.py").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_plan_mirrors_linked_dir_without_marker() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        create_file(outside.path(), "lib.py", "");
        create_file(temp_dir.path(), "main.py", "");
        std::os::unix::fs::symlink(outside.path(), temp_dir.path().join("shared")).unwrap();

        let plan = plan_for(temp_dir.path());
        assert_eq!(plan.dirs, vec![PathBuf::from("shared")]);
        assert!(plan.markers.is_empty());
        assert_eq!(plan.modules(), vec![temp_dir.path().join("main.py")]);

        plan.apply().unwrap();
        assert!(temp_dir.path().join("build/shared").is_dir());
        assert!(!outside.path().join("__init__.py").exists());
    }
}
