//! Folder statistics derived from a bucket store without reading any file.

use bytesize::ByteSize;
use serde::Serialize;

use super::store::SizeBucketStore;

/// Summary of a populated store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Records across all buckets
    pub total_files: usize,
    /// Sum of every record's size
    pub total_bytes: u64,
    /// Distinct file sizes
    pub distinct_sizes: usize,
    /// Buckets with two or more members
    pub candidate_buckets: usize,
    /// Records inside candidate buckets
    pub candidate_files: usize,
    /// Bytes inside candidate buckets
    pub candidate_bytes: u64,
    /// Records that are alone in their bucket
    pub unique_by_size: usize,
}

impl StoreStats {
    /// Compute statistics for `store`.
    ///
    /// # Examples
    ///
    /// ```
    /// use checksize::scanner::FileRecord;
    /// use checksize::uniqueness::{SizeBucketStore, StoreStats};
    ///
    /// let store: SizeBucketStore = vec![
    ///     FileRecord::new("/a", 10),
    ///     FileRecord::new("/b", 10),
    ///     FileRecord::new("/c", 99),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// let stats = StoreStats::from_store(&store);
    /// assert_eq!(stats.candidate_files, 2);
    /// assert_eq!(stats.unique_by_size, 1);
    /// ```
    #[must_use]
    pub fn from_store(store: &SizeBucketStore) -> Self {
        let mut stats = Self {
            distinct_sizes: store.bucket_count(),
            ..Default::default()
        };

        for (size, files) in store.iter() {
            let bytes = size.saturating_mul(files.len() as u64);
            stats.total_files += files.len();
            stats.total_bytes = stats.total_bytes.saturating_add(bytes);
            if files.len() > 1 {
                stats.candidate_buckets += 1;
                stats.candidate_files += files.len();
                stats.candidate_bytes = stats.candidate_bytes.saturating_add(bytes);
            } else {
                stats.unique_by_size += 1;
            }
        }

        stats
    }

    /// Total size in human-readable form.
    #[must_use]
    pub fn total_size_human(&self) -> String {
        ByteSize::b(self.total_bytes).to_string()
    }

    /// Candidate size in human-readable form.
    #[must_use]
    pub fn candidate_size_human(&self) -> String {
        ByteSize::b(self.candidate_bytes).to_string()
    }

    /// Share of records that need hashing at all.
    #[must_use]
    pub fn candidate_ratio(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            self.candidate_files as f64 / self.total_files as f64
        }
    }
}
