//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory tree
//! and producing [`FileRecord`]s ready to be dropped into a
//! [`SizeBucketStore`](crate::uniqueness::SizeBucketStore).
//!
//! # Features
//!
//! - Parallel directory traversal with deterministic (sorted) output
//! - Gitignore-style pattern matching via the `ignore` crate
//! - Size filtering (min/max)
//! - Hidden file filtering
//! - Media-only filtering (photo, audio, video)
//! - Cooperative stop via [`CancelToken`]
//!
//! Zero-length files are kept. They land in the size-0 bucket, which can
//! never be told apart by content and is reported as unresolved.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;

use super::{FileRecord, MediaKind, ScanError, WalkerConfig};
use crate::signal::CancelToken;

/// Everything a walk produced: the records it kept and the errors it skipped.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Files that passed every filter, in traversal order
    pub records: Vec<FileRecord>,
    /// Non-fatal errors met along the way
    pub errors: Vec<ScanError>,
    /// Whether the walk stopped early because of cancellation
    pub cancelled: bool,
}

impl Discovery {
    /// Total bytes across all discovered records.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }
}

/// Directory walker for parallel file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional token for graceful termination
    cancel: Option<CancelToken>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            cancel: None,
        }
    }

    /// Stop iteration once `token` is cancelled.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Build gitignore matcher from config patterns and the root .gitignore.
    fn build_gitignore(&self) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(&self.root);

        let gitignore_path = self.root.join(".gitignore");
        if gitignore_path.exists() {
            if let Some(e) = builder.add(&gitignore_path) {
                log::warn!(
                    "Failed to load .gitignore from {}: {}",
                    gitignore_path.display(),
                    e
                );
            } else {
                log::debug!("Loaded .gitignore from {}", gitignore_path.display());
            }
        }

        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Check a path against the ignore matcher, including its parent directories.
    fn should_ignore(&self, path: &Path, is_dir: bool, gitignore: &Option<Gitignore>) -> bool {
        let Some(gi) = gitignore else {
            return false;
        };
        let relative_path = path.strip_prefix(&self.root).unwrap_or(path);
        gi.matched_path_or_any_parents(relative_path, is_dir)
            .is_ignore()
    }

    fn passes_size_filter(&self, size: u64) -> bool {
        if self.config.min_size.is_some_and(|min| size < min) {
            return false;
        }
        if self.config.max_size.is_some_and(|max| size > max) {
            return false;
        }
        true
    }

    fn passes_media_filter(&self, path: &Path) -> bool {
        !self.config.media_only || MediaKind::of_path(path).is_some()
    }

    /// Walk the directory tree, yielding file records.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration. A missing or non-directory root yields exactly one error.
    pub fn walk(&self) -> Box<dyn Iterator<Item = Result<FileRecord, ScanError>> + '_> {
        if !self.root.exists() {
            return Box::new(std::iter::once(Err(ScanError::NotFound(self.root.clone()))));
        }
        if !self.root.is_dir() {
            return Box::new(std::iter::once(Err(ScanError::NotADirectory(
                self.root.clone(),
            ))));
        }

        let gitignore = self.build_gitignore();

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(self.config.skip_hidden)
            .process_read_dir(|_depth, _path, _read_dir_state, children| {
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        Box::new(
            walk_dir
                .into_iter()
                .take_while(move |_| {
                    let cancelled = self.is_cancelled();
                    if cancelled {
                        log::debug!("Walker: cancellation requested, stopping iteration");
                    }
                    !cancelled
                })
                .filter_map(move |entry_result| match entry_result {
                    Ok(entry) => {
                        let path = entry.path();
                        if path == self.root {
                            return None;
                        }

                        let file_type = entry.file_type();
                        if file_type.is_dir() {
                            return None;
                        }

                        if self.should_ignore(&path, false, &gitignore) {
                            log::trace!("Ignoring file: {}", path.display());
                            return None;
                        }

                        if file_type.is_symlink() && !self.config.follow_symlinks {
                            log::trace!("Skipping symlink: {}", path.display());
                            return None;
                        }

                        self.process_file(path)
                    }
                    Err(e) => {
                        let path = e
                            .path()
                            .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                        log::warn!("Walker error for {}: {}", path.display(), e);
                        Some(Err(ScanError::Io {
                            path,
                            source: std::io::Error::other(e.to_string()),
                        }))
                    }
                }),
        )
    }

    /// Stat one candidate and turn it into a record if it passes the filters.
    fn process_file(&self, path: PathBuf) -> Option<Result<FileRecord, ScanError>> {
        let metadata = if self.config.follow_symlinks {
            std::fs::metadata(&path)
        } else {
            std::fs::symlink_metadata(&path)
        };

        let metadata = match metadata {
            Ok(m) => m,
            Err(e) => return Some(Err(Self::classify_io_error(&path, e))),
        };

        if !metadata.is_file() {
            return None;
        }

        let size = metadata.len();
        if !self.passes_size_filter(size) {
            log::trace!("Skipping file due to size filter ({}): {}", size, path.display());
            return None;
        }

        if !self.passes_media_filter(&path) {
            log::trace!("Skipping non-media file: {}", path.display());
            return None;
        }

        Some(Ok(FileRecord { path, size }))
    }

    fn classify_io_error(path: &Path, error: std::io::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path.to_path_buf())
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path.to_path_buf())
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                }
            }
        }
    }

    /// Drain the walk into a [`Discovery`].
    #[must_use]
    pub fn discover(&self) -> Discovery {
        let mut discovery = Discovery::default();
        for result in self.walk() {
            match result {
                Ok(record) => discovery.records.push(record),
                Err(e) => discovery.errors.push(e),
            }
        }
        discovery.cancelled = self.is_cancelled();
        log::info!(
            "Discovered {} files under {} ({} errors)",
            discovery.records.len(),
            self.root.display(),
            discovery.errors.len()
        );
        discovery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.jpg"), b"photo bytes").unwrap();
        fs::write(dir.path().join("b.txt"), b"plain text").unwrap();
        fs::write(dir.path().join("empty.mp3"), b"").unwrap();

        let sub = dir.path().join("album");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("c.MOV"), b"video bytes here").unwrap();
        dir
    }

    fn names(records: &[FileRecord]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_walker_finds_all_files() {
        let dir = create_test_dir();
        let discovery = Walker::new(dir.path(), WalkerConfig::default()).discover();

        assert_eq!(discovery.records.len(), 4);
        assert!(discovery.errors.is_empty());
        assert!(!discovery.cancelled);
    }

    #[test]
    fn test_walker_keeps_empty_files() {
        let dir = create_test_dir();
        let discovery = Walker::new(dir.path(), WalkerConfig::default()).discover();

        assert!(discovery.records.iter().any(|r| r.size == 0));
    }

    #[test]
    fn test_walker_records_exact_sizes() {
        let dir = create_test_dir();
        let discovery = Walker::new(dir.path(), WalkerConfig::default()).discover();

        for record in &discovery.records {
            assert_eq!(record.size, fs::metadata(&record.path).unwrap().len());
        }
        assert_eq!(discovery.total_bytes(), 11 + 10 + 16);
    }

    #[test]
    fn test_walker_media_only() {
        let dir = create_test_dir();
        let config = WalkerConfig::default().with_media_only(true);
        let discovery = Walker::new(dir.path(), config).discover();

        let mut found = names(&discovery.records);
        found.sort();
        assert_eq!(found, vec!["a.jpg", "c.MOV", "empty.mp3"]);
    }

    #[test]
    fn test_walker_size_filter() {
        let dir = create_test_dir();
        let config = WalkerConfig::default().with_size_range(Some(1), Some(11));
        let discovery = Walker::new(dir.path(), config).discover();

        let mut found = names(&discovery.records);
        found.sort();
        assert_eq!(found, vec!["a.jpg", "b.txt"]);
    }

    #[test]
    fn test_walker_ignore_patterns() {
        let dir = create_test_dir();
        let config = WalkerConfig::default().with_ignore_patterns(vec!["*.txt".to_string()]);
        let discovery = Walker::new(dir.path(), config).discover();

        assert!(!names(&discovery.records).contains(&"b.txt".to_string()));
        assert_eq!(discovery.records.len(), 3);
    }

    #[test]
    fn test_walker_ignores_directory_pattern() {
        let dir = create_test_dir();
        let config = WalkerConfig::default().with_ignore_patterns(vec!["album/".to_string()]);
        let discovery = Walker::new(dir.path(), config).discover();

        assert!(!names(&discovery.records).contains(&"c.MOV".to_string()));
    }

    #[test]
    fn test_walker_skip_hidden() {
        let dir = create_test_dir();
        fs::write(dir.path().join(".hidden.jpg"), b"secret").unwrap();

        let config = WalkerConfig {
            skip_hidden: true,
            ..Default::default()
        };
        let discovery = Walker::new(dir.path(), config).discover();
        assert!(!names(&discovery.records).contains(&".hidden.jpg".to_string()));
    }

    #[test]
    fn test_walker_missing_root() {
        let dir = TempDir::new().unwrap();
        let discovery = Walker::new(&dir.path().join("nope"), WalkerConfig::default()).discover();

        assert!(discovery.records.is_empty());
        assert!(matches!(discovery.errors[0], ScanError::NotFound(_)));
    }

    #[test]
    fn test_walker_root_is_file() {
        let dir = create_test_dir();
        let discovery =
            Walker::new(&dir.path().join("a.jpg"), WalkerConfig::default()).discover();

        assert!(matches!(discovery.errors[0], ScanError::NotADirectory(_)));
    }

    #[test]
    fn test_walker_cancelled_before_start() {
        let dir = create_test_dir();
        let token = CancelToken::new();
        token.cancel();

        let discovery = Walker::new(dir.path(), WalkerConfig::default())
            .with_cancel_token(token)
            .discover();

        assert!(discovery.records.is_empty());
        assert!(discovery.cancelled);
    }

    #[test]
    fn test_walker_deterministic_order() {
        let dir = create_test_dir();
        let first = Walker::new(dir.path(), WalkerConfig::default()).discover();
        let second = Walker::new(dir.path(), WalkerConfig::default()).discover();

        assert_eq!(first.records, second.records);
    }
}
