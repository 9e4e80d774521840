//! Size-bucketed file collection.
//!
//! # Overview
//!
//! Files of different sizes can never share content, so everything starts by
//! bucketing records on their exact byte length. Only buckets holding two or
//! more records are candidates for resolution; single-member buckets are
//! unique by size alone.
//!
//! The store is a plain owned value. It is rebuilt wholesale on every
//! re-scan: a background discovery fills a fresh store and then publishes it
//! with [`SizeBucketStore::replace_all`], which swaps the whole mapping in a
//! single assignment.
//!
//! # Example
//!
//! ```
//! use checksize::scanner::FileRecord;
//! use checksize::uniqueness::SizeBucketStore;
//!
//! let mut store = SizeBucketStore::new();
//! store.append_all(vec![
//!     FileRecord::new("/a.jpg", 1024),
//!     FileRecord::new("/b.jpg", 1024),
//!     FileRecord::new("/c.jpg", 2048),
//! ]);
//!
//! assert_eq!(store.total_file_count(), 3);
//! assert_eq!(store.buckets_with_multiple_members(), vec![1024]);
//! assert_eq!(store.buckets_with_single_member(), vec![2048]);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::scanner::FileRecord;

/// Mapping from exact file size to the records of that size.
///
/// Records keep their insertion order within a bucket. Iteration across
/// buckets follows the underlying hash map and is unordered; use
/// [`sorted_sizes`](Self::sorted_sizes) when order matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeBucketStore {
    buckets: HashMap<u64, Vec<FileRecord>>,
}

impl SizeBucketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one record into the bucket for its size.
    pub fn append(&mut self, record: FileRecord) {
        self.buckets.entry(record.size).or_default().push(record);
    }

    /// Insert records one at a time, in input order.
    pub fn append_all<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = FileRecord>,
    {
        for record in records {
            self.append(record);
        }
    }

    /// Discard the current contents and adopt `other`'s mapping.
    pub fn replace_all(&mut self, other: SizeBucketStore) {
        self.buckets = other.buckets;
        log::debug!(
            "Bucket store replaced: {} files in {} buckets",
            self.total_file_count(),
            self.buckets.len()
        );
    }

    /// Remove every bucket.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Number of records of exactly `size` bytes.
    #[must_use]
    pub fn count(&self, size: u64) -> usize {
        self.buckets.get(&size).map_or(0, Vec::len)
    }

    /// Whether any record of exactly `size` bytes exists.
    #[must_use]
    pub fn contains(&self, size: u64) -> bool {
        self.buckets.contains_key(&size)
    }

    /// Records in the bucket for `size`, without copying.
    #[must_use]
    pub fn files(&self, size: u64) -> &[FileRecord] {
        self.buckets.get(&size).map_or(&[], Vec::as_slice)
    }

    /// Every bucket as `(size, records)`, in store order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[FileRecord])> + '_ {
        self.buckets
            .iter()
            .map(|(size, files)| (*size, files.as_slice()))
    }

    /// All distinct sizes, in store order.
    #[must_use]
    pub fn all_sizes(&self) -> Vec<u64> {
        self.buckets.keys().copied().collect()
    }

    /// All distinct sizes, ascending.
    #[must_use]
    pub fn sorted_sizes(&self) -> Vec<u64> {
        let mut sizes = self.all_sizes();
        sizes.sort_unstable();
        sizes
    }

    /// Number of distinct sizes.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total records across all buckets.
    #[must_use]
    pub fn total_file_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Total bytes across all records.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.buckets
            .iter()
            .map(|(size, files)| size.saturating_mul(files.len() as u64))
            .fold(0u64, u64::saturating_add)
    }

    /// Sizes whose bucket has two or more records, in store order.
    ///
    /// These are the only candidates for resolution.
    #[must_use]
    pub fn buckets_with_multiple_members(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|(size, _)| *size)
            .collect()
    }

    /// Sizes whose bucket has exactly one record, in store order.
    #[must_use]
    pub fn buckets_with_single_member(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .filter(|(_, files)| files.len() == 1)
            .map(|(size, _)| *size)
            .collect()
    }
}

impl FromIterator<FileRecord> for SizeBucketStore {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut store = Self::new();
        store.append_all(iter);
        store
    }
}

impl Extend<FileRecord> for SizeBucketStore {
    fn extend<I: IntoIterator<Item = FileRecord>>(&mut self, iter: I) {
        self.append_all(iter);
    }
}
