//! Output formatters for resolution results.
//!
//! This module provides different output formats:
//! - Text for people, with colored headings
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! Every formatter reads from a [`RunReport`], which gathers the store, the
//! resolution, and the exit code into one borrowed view.
//!
//! # Example
//!
//! ```no_run
//! use checksize::output::{json::JsonOutput, RunReport};
//! use checksize::uniqueness::{SizeBucketStore, UniquenessResolver};
//! use std::path::Path;
//!
//! let store = SizeBucketStore::new();
//! let resolution = UniquenessResolver::with_defaults().resolve(&store).unwrap();
//! let report = RunReport::new(Path::new("."), &store, &resolution, 0);
//!
//! println!("{}", JsonOutput::new(&report).to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

use std::path::Path;

use crate::error::ExitCode;
use crate::uniqueness::{Resolution, SizeBucketStore, StoreStats};

pub use self::csv::CsvOutput;
pub use self::json::JsonOutput;
pub use self::text::TextOutput;

/// Everything a formatter needs about one run.
#[derive(Debug)]
pub struct RunReport<'a> {
    /// Scanned directory or loaded record file
    pub source: &'a Path,
    /// Bucketed records the run worked on
    pub store: &'a SizeBucketStore,
    /// Counts derived from `store`
    pub store_stats: StoreStats,
    /// What the resolver produced
    pub resolution: &'a Resolution,
    /// Candidate sizes without an entry, ascending
    pub unresolved: Vec<u64>,
    /// Entries the walker could not read
    pub scan_errors: usize,
    /// Exit code for this run
    pub exit_code: ExitCode,
}

impl<'a> RunReport<'a> {
    /// Build a report, deriving statistics and the exit code.
    #[must_use]
    pub fn new(
        source: &'a Path,
        store: &'a SizeBucketStore,
        resolution: &'a Resolution,
        scan_errors: usize,
    ) -> Self {
        let store_stats = StoreStats::from_store(store);
        let unresolved = resolution.unresolved_sizes(&store.buckets_with_multiple_members());
        let exit_code = ExitCode::for_run(
            resolution.cancelled,
            scan_errors + resolution.stats.digest_errors(),
            store_stats.candidate_buckets,
        );
        Self {
            source,
            store,
            store_stats,
            resolution,
            unresolved,
            scan_errors,
            exit_code,
        }
    }

    /// Bucket rows ordered by size: `(size, file count, prefix length)`.
    ///
    /// Covers every candidate bucket; unresolved ones carry `None`.
    #[must_use]
    pub fn rows(&self) -> Vec<(u64, usize, Option<u64>)> {
        let mut sizes = self.store.buckets_with_multiple_members();
        sizes.sort_unstable();
        sizes
            .into_iter()
            .map(|size| (size, self.store.count(size), self.resolution.result.get(size)))
            .collect()
    }
}
