//! Data structures for saved record files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scanner::{FileRecord, WalkerConfig};
use crate::uniqueness::SizeBucketStore;

/// Current version of the record file format.
pub const RECORDS_VERSION: u32 = 1;

/// Files discovered by one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Format version.
    pub version: u32,
    /// When the records were captured.
    pub created_at: DateTime<Utc>,
    /// Directory that was scanned.
    pub root: PathBuf,
    /// Filters in effect during the scan.
    #[serde(default)]
    pub settings: RecordSettings,
    /// Discovered files, in discovery order.
    pub records: Vec<FileRecord>,
}

impl RecordSet {
    /// Create a record set stamped with the current time and version.
    ///
    /// JSON cannot hold non-UTF-8 paths, so records with such paths are
    /// left out with a warning.
    pub fn new(root: PathBuf, settings: RecordSettings, mut records: Vec<FileRecord>) -> Self {
        let before = records.len();
        records.retain(|record| {
            let representable = record.path.to_str().is_some();
            if !representable {
                log::warn!(
                    "Not saving {}: path is not valid UTF-8",
                    record.path.to_string_lossy()
                );
            }
            representable
        });
        if records.len() < before {
            log::warn!("{} records skipped in saved file", before - records.len());
        }

        Self {
            version: RECORDS_VERSION,
            created_at: Utc::now(),
            root,
            settings,
            records,
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no files were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bucket the records by size.
    #[must_use]
    pub fn to_store(&self) -> SizeBucketStore {
        self.records.iter().cloned().collect()
    }
}

/// Walker settings that produced a record set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSettings {
    /// Symbolic links were followed.
    pub follow_symlinks: bool,
    /// Hidden entries were skipped.
    pub skip_hidden: bool,
    /// Minimum file size (in bytes).
    pub min_size: Option<u64>,
    /// Maximum file size (in bytes).
    pub max_size: Option<u64>,
    /// Extra ignore patterns.
    pub ignore_patterns: Vec<String>,
    /// Only media files were kept.
    pub media_only: bool,
}

impl From<&WalkerConfig> for RecordSettings {
    fn from(config: &WalkerConfig) -> Self {
        Self {
            follow_symlinks: config.follow_symlinks,
            skip_hidden: config.skip_hidden,
            min_size: config.min_size,
            max_size: config.max_size,
            ignore_patterns: config.ignore_patterns.clone(),
            media_only: config.media_only,
        }
    }
}
