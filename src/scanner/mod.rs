//! Scanner module for file discovery and prefix digests.
//!
//! This module provides functionality for:
//! - Parallel directory walking using jwalk
//! - Prefix digests with BLAKE3
//! - Media-type filtering for photo, audio and video libraries
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: The [`PrefixChecksum`] contract and its BLAKE3 implementation
//!
//! # Example
//!
//! ```no_run
//! use checksize::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     skip_hidden: true,
//!     media_only: true,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(record) => println!("{}: {} bytes", record.path.display(), record.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use hasher::{digest_to_hex, Blake3Prefix, Digest, PrefixChecksum};
pub use walker::{Discovery, Walker};

/// One discovered file: where it lives and how many bytes it holds.
///
/// The size is captured once at discovery and never re-read; everything
/// downstream trusts it to match the file content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path used to reopen the file for digesting
    pub path: PathBuf,
    /// Exact file length in bytes
    pub size: u64,
}

impl FileRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// Media families the walker can restrict discovery to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Still images, including camera raw formats
    Photo,
    /// Audio tracks
    Audio,
    /// Video clips
    Video,
}

impl MediaKind {
    /// All media kinds.
    pub const ALL: [MediaKind; 3] = [MediaKind::Photo, MediaKind::Audio, MediaKind::Video];

    /// Lowercase file extensions belonging to this kind.
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Photo => &[
                "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "heic", "heif", "avif",
                "cr2", "cr3", "nef", "arw", "dng", "orf", "rw2", "raf",
            ],
            MediaKind::Audio => &[
                "mp3", "m4a", "aac", "flac", "wav", "aiff", "aif", "ogg", "opus", "wma", "alac",
            ],
            MediaKind::Video => &[
                "mp4", "m4v", "mov", "avi", "mkv", "webm", "wmv", "mpg", "mpeg", "3gp", "mts",
                "m2ts",
            ],
        }
    }

    /// Classify a path by its extension.
    #[must_use]
    pub fn of_path(path: &Path) -> Option<MediaKind> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.extensions().contains(&extension.as_str()))
    }
}

/// Configuration for directory walking.
///
/// Controls filtering, symlink handling, and other walk behavior.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (gitignore-style).
    /// These are applied in addition to any .gitignore at the root.
    pub ignore_patterns: Vec<String>,

    /// Only keep photo, audio and video files.
    pub media_only: bool,
}

impl WalkerConfig {
    /// Restrict discovery to media files.
    #[must_use]
    pub fn with_media_only(mut self, media_only: bool) -> Self {
        self.media_only = media_only;
        self
    }

    /// Set the inclusive size window.
    #[must_use]
    pub fn with_size_range(mut self, min_size: Option<u64>, max_size: Option<u64>) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    /// Add gitignore-style patterns.
    #[must_use]
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while digesting a file prefix.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => HashError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => HashError::PermissionDenied(path.to_path_buf()),
            _ => HashError::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
