// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Workspace resolution
//!
//! Turns declared glob patterns into concrete paths inside a task's working
//! directory, and creates those directories on demand.

mod patterns;

pub use patterns::{Matched, Patterns, Resolved};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::WatermillError;

/// Capability to match one glob against a directory
pub trait GlobMatcher: Send + Sync {
    /// Return every file under `dir` matching `pattern`
    fn matches(&self, pattern: &str, dir: &Path) -> Result<Vec<PathBuf>, WatermillError>;
}

/// Glob matching against the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsGlob;

impl GlobMatcher for FsGlob {
    fn matches(&self, pattern: &str, dir: &Path) -> Result<Vec<PathBuf>, WatermillError> {
        // The workspace path is literal; only the task's glob is a pattern
        let full_pattern = if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            Path::new(&glob::Pattern::escape(&dir.to_string_lossy()))
                .join(pattern)
                .to_string_lossy()
                .to_string()
        };

        let mut matches = Vec::new();
        for entry in glob::glob(&full_pattern)? {
            let path = entry.map_err(|e| WatermillError::directory(e.path(), e.error()))?;
            if path.is_file() {
                matches.push(path);
            }
        }

        Ok(matches)
    }
}

/// Which side of a task a resolution is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Input,
    Output,
}

/// Resolves task patterns within workspace directories
#[derive(Clone)]
pub struct Resolver {
    matcher: Arc<dyn GlobMatcher>,
}

impl Resolver {
    pub fn new(matcher: Arc<dyn GlobMatcher>) -> Self {
        Self { matcher }
    }

    /// Resolve declared input before a task runs
    ///
    /// Fails with `InputResolution` on the first glob that matches nothing.
    pub async fn resolve(
        &self,
        task: &str,
        patterns: &Patterns,
        dir: &Path,
    ) -> Result<Resolved, WatermillError> {
        self.resolve_blocking(task, patterns, dir, Side::Input).await
    }

    /// Re-resolve declared output after a task ran
    ///
    /// Fails with `OutputNotFound` on the first glob that matches nothing.
    pub async fn verify(
        &self,
        task: &str,
        patterns: &Patterns,
        dir: &Path,
    ) -> Result<Resolved, WatermillError> {
        self.resolve_blocking(task, patterns, dir, Side::Output).await
    }

    /// Walk the filesystem on the blocking pool
    async fn resolve_blocking(
        &self,
        task: &str,
        patterns: &Patterns,
        dir: &Path,
        side: Side,
    ) -> Result<Resolved, WatermillError> {
        let this = self.clone();
        let (task, patterns, dir) = (task.to_string(), patterns.clone(), dir.to_path_buf());

        tokio::task::spawn_blocking(move || this.resolve_side(&task, &patterns, &dir, side))
            .await
            .map_err(|e| WatermillError::Io {
                message: format!("glob resolution did not complete: {}", e),
            })?
    }

    fn resolve_side(
        &self,
        task: &str,
        patterns: &Patterns,
        dir: &Path,
        side: Side,
    ) -> Result<Resolved, WatermillError> {
        match patterns {
            Patterns::Single(glob) => self.resolve_glob(task, glob, dir, side).map(Resolved::Single),
            Patterns::List(globs) => globs
                .iter()
                .map(|g| self.resolve_glob(task, g, dir, side))
                .collect::<Result<Vec<_>, _>>()
                .map(Resolved::List),
            Patterns::Named(map) => map
                .iter()
                .map(|(name, inner)| {
                    self.resolve_side(task, inner, dir, side)
                        .map(|r| (name.clone(), r))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Resolved::Named),
        }
    }

    fn resolve_glob(
        &self,
        task: &str,
        glob: &str,
        dir: &Path,
        side: Side,
    ) -> Result<Matched, WatermillError> {
        let mut paths = self.matcher.matches(glob, dir)?;

        if paths.is_empty() {
            let (task, pattern, dir) = (task.to_string(), glob.to_string(), dir.to_path_buf());
            return Err(match side {
                Side::Input => WatermillError::InputResolution { task, pattern, dir },
                Side::Output => WatermillError::OutputNotFound { task, pattern, dir },
            });
        }

        paths.sort();
        paths.dedup();
        Ok(Matched(paths))
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Arc::new(FsGlob))
    }
}

/// Create a workspace directory if needed and return its absolute path
///
/// Relative `dir` values are taken relative to `base`.
pub async fn ensure_dir(base: &Path, dir: &Path) -> Result<PathBuf, WatermillError> {
    let target = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base.join(dir)
    };

    tokio::fs::create_dir_all(&target)
        .await
        .map_err(|e| WatermillError::directory(&target, e))?;

    tokio::fs::canonicalize(&target)
        .await
        .map_err(|e| WatermillError::directory(&target, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[tokio::test]
    async fn test_resolve_single_sorted() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.sam");
        touch(tmp.path(), "a.sam");
        touch(tmp.path(), "c.bam");

        let resolved = Resolver::default()
            .resolve("t", &Patterns::from("*.sam"), tmp.path())
            .await
            .unwrap();

        let Resolved::Single(matched) = resolved else {
            panic!("Expected single match set");
        };
        let names: Vec<_> = matched
            .paths()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.sam", "b.sam"]);
    }

    #[tokio::test]
    async fn test_resolve_keeps_named_shape() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "x_1.fastq.gz");
        touch(tmp.path(), "x_2.fastq.gz");
        touch(tmp.path(), "ref.fa");

        let patterns = Patterns::named([
            ("reads", Patterns::from(["*_1.fastq.gz", "*_2.fastq.gz"])),
            ("reference", Patterns::from("*.fa")),
        ]);
        let resolved = Resolver::default().resolve("t", &patterns, tmp.path()).await.unwrap();

        let reads = resolved.get("reads").unwrap();
        assert!(reads.at(0).unwrap().first().unwrap().ends_with("x_1.fastq.gz"));
        assert!(reads.at(1).unwrap().first().unwrap().ends_with("x_2.fastq.gz"));
        assert!(matches!(resolved.get("reference"), Some(Resolved::Single(_))));
    }

    #[tokio::test]
    async fn test_recursive_glob() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "ERR045788/ERR045788.sra");

        let resolved = Resolver::default()
            .resolve("t", &Patterns::from("**/*.sra"), tmp.path())
            .await
            .unwrap();
        assert_eq!(resolved.paths().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_input_is_input_resolution_error() {
        let tmp = TempDir::new().unwrap();
        let err = Resolver::default()
            .resolve("fastq-dump", &Patterns::from("**/*.sra"), tmp.path())
            .await
            .unwrap_err();

        assert!(matches!(err, WatermillError::InputResolution { ref pattern, .. } if pattern == "**/*.sra"));
    }

    #[tokio::test]
    async fn test_missing_output_is_output_not_found() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "one.bt2");

        let patterns = Patterns::from(["*.bt2", "*.sam"]);
        let err = Resolver::default()
            .verify("map", &patterns, tmp.path())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "OutputNotFoundError");
    }

    #[tokio::test]
    async fn test_directories_do_not_match() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("out.sam")).unwrap();

        let result = Resolver::default().resolve("t", &Patterns::from("*.sam"), tmp.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_workspace_with_glob_metacharacters() {
        let tmp = TempDir::new().unwrap();
        let ws = tmp.path().join("run[1]");
        touch(&ws, "a.txt");
        touch(&ws, "b.txt");
        touch(tmp.path(), "r.txt");

        let resolved = Resolver::default()
            .resolve("t", &Patterns::from("*.txt"), &ws)
            .await
            .unwrap();

        assert_eq!(resolved.paths().len(), 2);
        assert!(resolved.paths().iter().all(|p| p.starts_with(&ws)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_subdirectory_is_directory_error() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "open/a.sra");
        touch(tmp.path(), "locked/b.sra");
        let locked = tmp.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not bind a privileged user
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = Resolver::default()
            .resolve("t", &Patterns::from("**/*.sra"), tmp.path())
            .await;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let err = result.unwrap_err();
        assert_eq!(err.kind(), "DirectoryError");
    }

    #[tokio::test]
    async fn test_ensure_dir_creates_relative() {
        let tmp = TempDir::new().unwrap();
        let dir = ensure_dir(tmp.path(), Path::new("nested/ws")).await.unwrap();

        assert!(dir.is_absolute());
        assert!(dir.is_dir());
        assert!(dir.ends_with("nested/ws"));
    }

    #[tokio::test]
    async fn test_ensure_dir_reports_directory_error() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "file");

        let err = ensure_dir(tmp.path(), Path::new("file/sub")).await.unwrap_err();
        assert_eq!(err.kind(), "DirectoryError");
    }
}
