//! Filesystem abstractions used for extraction and cache probing.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_FILES;
use crate::error::{Result, RuntCheckError};

/// Limits and exclusions applied to every repository walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkOptions {
    /// Maximum number of files visited before the walk fails.
    pub max_files: usize,
    /// Directory names that are never descended into.
    pub skip_dirs: Vec<String>,
    /// Name prefixes of hidden entries that are still walked.
    pub allowed_hidden: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            skip_dirs: [
                "node_modules",
                "target",
                "__pycache__",
                "venv",
                "dist",
                "build",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            allowed_hidden: [
                ".github",
                ".gitlab-ci.yml",
                ".eslintrc",
                ".flake8",
                ".pylintrc",
                ".ruff.toml",
                ".rustfmt.toml",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
        }
    }
}

impl WalkOptions {
    fn skips(&self, path: &Path, is_dir: bool) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return true;
        };
        if name.starts_with('.') {
            return !self
                .allowed_hidden
                .iter()
                .any(|allowed| name.starts_with(allowed.as_str()));
        }
        is_dir && self.skip_dirs.iter().any(|skip| skip == name)
    }
}

/// Abstraction over filesystem access for testability.
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem {
    /// Whether `path` exists.
    fn exists(&self, path: &Path) -> bool;
    /// List files under `root`, sorted, failing once `options.max_files` is exceeded.
    fn list_files(&self, root: &Path, options: &WalkOptions) -> Result<Vec<PathBuf>>;
    /// Newest modification time among the files and directories a walk would visit.
    ///
    /// Directory times cover deletions and renames, which leave no file behind.
    fn latest_modified(&self, root: &Path, options: &WalkOptions)
    -> Result<Option<DateTime<Utc>>>;
    /// Immediate subdirectories of `dir` that a walk would descend into, sorted.
    fn list_dirs(&self, dir: &Path, options: &WalkOptions) -> Result<Vec<PathBuf>>;
    /// Read a file into a string.
    fn read_to_string(&self, path: &Path) -> Result<String>;
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone)]
pub struct StdFileSystem;

impl StdFileSystem {
    /// Create a new standard filesystem adapter.
    pub fn new() -> Self {
        Self
    }

    /// Visit every walked entry; the flag is true for directories, root included.
    fn walk(
        &self,
        root: &Path,
        options: &WalkOptions,
        mut visit: impl FnMut(PathBuf, &std::fs::Metadata, bool),
    ) -> Result<()> {
        let mut visited = 0usize;
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) if dir != root => {
                    warn!("skipping unreadable directory {}: {err}", dir.display());
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            match std::fs::metadata(&dir) {
                Ok(metadata) => visit(dir.clone(), &metadata, true),
                Err(err) => warn!("skipping {}: {err}", dir.display()),
            }
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!("skipping unreadable entry in {}: {err}", dir.display());
                        continue;
                    }
                };
                let path = entry.path();
                let file_type = match entry.file_type() {
                    Ok(file_type) => file_type,
                    Err(err) => {
                        warn!("skipping {}: {err}", path.display());
                        continue;
                    }
                };
                if options.skips(&path, file_type.is_dir()) {
                    continue;
                }
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    visited += 1;
                    if visited > options.max_files {
                        return Err(RuntCheckError::RepoTooLarge {
                            path: root.to_path_buf(),
                            limit: options.max_files,
                        });
                    }
                    match entry.metadata() {
                        Ok(metadata) => visit(path, &metadata, false),
                        Err(err) => warn!("skipping {}: {err}", path.display()),
                    }
                }
            }
        }

        Ok(())
    }
}

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_files(&self, root: &Path, options: &WalkOptions) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        self.walk(root, options, |path, _, is_dir| {
            if !is_dir {
                files.push(path);
            }
        })?;
        files.sort();
        Ok(files)
    }

    fn latest_modified(
        &self,
        root: &Path,
        options: &WalkOptions,
    ) -> Result<Option<DateTime<Utc>>> {
        let mut latest: Option<SystemTime> = None;
        self.walk(root, options, |_, metadata, _| {
            if let Ok(modified) = metadata.modified() {
                latest = Some(latest.map_or(modified, |current| current.max(modified)));
            }
        })?;
        Ok(latest.map(DateTime::<Utc>::from))
    }

    fn list_dirs(&self, dir: &Path, options: &WalkOptions) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_dir = entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false);
            if is_dir && !options.skips(&path, true) {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{StdFileSystem, WalkOptions};
    use crate::error::RuntCheckError;
    use crate::fs::FileSystem;
    use chrono::{DateTime, Utc};
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    #[test]
    fn std_filesystem_lists_and_reads_files() {
        let root = std::env::temp_dir().join(unique_dir_name());
        std::fs::create_dir_all(root.join("src")).expect("create temp dir");
        let file_path = root.join("src/server.py");
        std::fs::write(&file_path, "import mcp").expect("write test file");

        let fs = StdFileSystem::new();
        let files = fs
            .list_files(&root, &WalkOptions::default())
            .expect("list files");
        assert_eq!(files, vec![file_path.clone()]);

        let contents = fs.read_to_string(&file_path).expect("read file");
        assert_eq!(contents, "import mcp");
        assert!(
            fs.latest_modified(&root, &WalkOptions::default())
                .expect("mtime")
                .is_some()
        );

        std::fs::remove_dir_all(&root).expect("cleanup temp dir");
    }

    #[test]
    fn walk_skips_vendor_and_hidden_dirs_but_keeps_workflows() {
        let root = std::env::temp_dir().join(unique_dir_name());
        for dir in ["node_modules/pkg", ".git", ".github/workflows"] {
            std::fs::create_dir_all(root.join(dir)).expect("create dir");
        }
        std::fs::write(root.join("node_modules/pkg/index.js"), "x").expect("write");
        std::fs::write(root.join(".git/HEAD"), "ref").expect("write");
        std::fs::write(root.join(".github/workflows/ci.yml"), "on: push").expect("write");
        std::fs::write(root.join(".flake8"), "[flake8]").expect("write");

        let files = StdFileSystem::new()
            .list_files(&root, &WalkOptions::default())
            .expect("list files");

        assert_eq!(
            files,
            vec![root.join(".flake8"), root.join(".github/workflows/ci.yml")]
        );
        let dirs = StdFileSystem::new()
            .list_dirs(&root, &WalkOptions::default())
            .expect("list dirs");
        assert_eq!(dirs, vec![root.join(".github")]);

        std::fs::remove_dir_all(&root).expect("cleanup temp dir");
    }

    #[test]
    fn latest_modified_tracks_directory_changes() {
        let root = std::env::temp_dir().join(unique_dir_name());
        std::fs::create_dir_all(root.join("src")).expect("create dir");
        let file_path = root.join("src/server.py");
        std::fs::write(&file_path, "import mcp").expect("write test file");
        let fs = StdFileSystem::new();
        let options = WalkOptions::default();

        let future = SystemTime::now() + Duration::from_secs(300);
        std::fs::File::open(root.join("src"))
            .expect("open dir")
            .set_modified(future)
            .expect("set dir mtime");
        let latest = fs.latest_modified(&root, &options).expect("mtime");
        assert!(latest >= Some(DateTime::<Utc>::from(future - Duration::from_secs(1))));

        std::fs::remove_file(&file_path).expect("remove file");
        std::fs::remove_dir(root.join("src")).expect("remove dir");
        assert!(fs.latest_modified(&root, &options).expect("mtime").is_some());

        std::fs::remove_dir_all(&root).expect("cleanup temp dir");
    }

    #[test]
    fn walk_fails_when_file_ceiling_exceeded() {
        let root = std::env::temp_dir().join(unique_dir_name());
        std::fs::create_dir_all(&root).expect("create dir");
        for index in 0..4 {
            std::fs::write(root.join(format!("f{index}.txt")), "x").expect("write");
        }
        let options = WalkOptions {
            max_files: 3,
            ..WalkOptions::default()
        };

        let err = StdFileSystem::new()
            .list_files(&root, &options)
            .expect_err("too large");
        assert!(matches!(err, RuntCheckError::RepoTooLarge { limit: 3, .. }));

        std::fs::remove_dir_all(&root).expect("cleanup temp dir");
    }

    fn unique_dir_name() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        PathBuf::from(format!("runtcheck_fs_test_{nanos}"))
    }
}
