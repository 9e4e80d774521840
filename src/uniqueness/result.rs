//! Resolution output.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::scanner::HashError;

/// Minimal sufficient prefix length per bucket size.
///
/// Only buckets that became fully distinguishable appear. A candidate bucket
/// missing from the result either holds exact duplicates, hit unreadable
/// files, or was not reached before cancellation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniquenessResult {
    prefix_by_size: HashMap<u64, u64>,
}

impl UniquenessResult {
    /// Create an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, size: u64, prefix_len: u64) {
        self.prefix_by_size.insert(size, prefix_len);
    }

    /// Prefix length that separates every file of `size` bytes.
    #[must_use]
    pub fn get(&self, size: u64) -> Option<u64> {
        self.prefix_by_size.get(&size).copied()
    }

    /// Whether `size` resolved.
    #[must_use]
    pub fn contains(&self, size: u64) -> bool {
        self.prefix_by_size.contains_key(&size)
    }

    /// Number of resolved buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prefix_by_size.len()
    }

    /// Whether nothing resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefix_by_size.is_empty()
    }

    /// `(size, prefix_len)` pairs ordered by size.
    #[must_use]
    pub fn sorted(&self) -> Vec<(u64, u64)> {
        let mut pairs: Vec<_> = self
            .prefix_by_size
            .iter()
            .map(|(size, prefix)| (*size, *prefix))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// How many buckets needed each prefix length.
    #[must_use]
    pub fn distribution(&self) -> BTreeMap<u64, usize> {
        let mut histogram = BTreeMap::new();
        for prefix in self.prefix_by_size.values() {
            *histogram.entry(*prefix).or_insert(0) += 1;
        }
        histogram
    }

    /// Prefix length as a fraction of the file size.
    ///
    /// Can exceed 1.0 because the last schedule step reads one floor chunk
    /// past the end of the file. `None` for unresolved or zero-length sizes.
    #[must_use]
    pub fn fraction_of_size(&self, size: u64) -> Option<f64> {
        if size == 0 {
            return None;
        }
        self.get(size).map(|prefix| prefix as f64 / size as f64)
    }

    /// Whether every entry here also appears, with the same value, in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &UniquenessResult) -> bool {
        self.prefix_by_size
            .iter()
            .all(|(size, prefix)| other.get(*size) == Some(*prefix))
    }
}

/// Counters collected during one run.
#[derive(Debug, Default)]
pub struct ResolveStats {
    /// Buckets with two or more members
    pub candidate_buckets: usize,
    /// Files across all candidate buckets
    pub candidate_files: usize,
    /// Buckets that finished, whatever the outcome
    pub finished_buckets: usize,
    /// Buckets that became distinguishable
    pub resolved_buckets: usize,
    /// Buckets that ran out of schedule without resolving
    pub exhausted_buckets: usize,
    /// Successful digest computations
    pub digests_computed: usize,
    /// Bytes fed to the digest across all successful computations
    pub bytes_read: u64,
    /// Per-file digest failures, in the order they were met
    pub errors: Vec<HashError>,
    /// Wall-clock time of the run
    pub duration: Duration,
}

impl ResolveStats {
    /// Number of digest failures.
    #[must_use]
    pub fn digest_errors(&self) -> usize {
        self.errors.len()
    }

    /// Bytes read compared with reading every candidate file in full.
    #[must_use]
    pub fn read_ratio(&self, full_bytes: u64) -> f64 {
        if full_bytes == 0 {
            0.0
        } else {
            self.bytes_read as f64 / full_bytes as f64
        }
    }
}

/// Everything a resolution run hands back.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Resolved buckets; partial if `cancelled`
    pub result: UniquenessResult,
    /// Whether the run stopped early
    pub cancelled: bool,
    /// Run counters
    pub stats: ResolveStats,
}

impl Resolution {
    /// Candidate sizes that did not resolve, ascending.
    ///
    /// Includes buckets never reached when the run was cancelled.
    #[must_use]
    pub fn unresolved_sizes(&self, candidates: &[u64]) -> Vec<u64> {
        let mut sizes: Vec<u64> = candidates
            .iter()
            .copied()
            .filter(|size| !self.result.contains(*size))
            .collect();
        sizes.sort_unstable();
        sizes
    }
}
