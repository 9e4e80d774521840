//! Uniqueness resolution.
//!
//! # Overview
//!
//! For every bucket with two or more members the resolver walks that
//! bucket's [checksum schedule](super::checksum_schedule) in ascending order.
//! At each prefix length it digests every member from offset zero into a
//! fresh set; as soon as the set holds one digest per member, that prefix
//! length is recorded as the bucket's answer and the bucket stops.
//!
//! A bucket that runs out of schedule is left out of the result. With the
//! last step covering the whole file, this only happens for exact duplicates
//! or for buckets containing a file that could not be read.
//!
//! # Failure handling
//!
//! - A digest error drops that file's digest for the step, so the bucket can
//!   never falsely resolve. The error is logged, counted, and the run goes on.
//! - A record whose size differs from its bucket key aborts the run before
//!   any digest is computed.
//! - Cancellation is polled before each bucket and before each schedule step.
//!   It is reported through [`Resolution::cancelled`] with whatever resolved
//!   so far, never as an error.
//!
//! # Example
//!
//! ```no_run
//! use checksize::scanner::{FileRecord, Blake3Prefix};
//! use checksize::uniqueness::{resolve_with, SizeBucketStore};
//! use checksize::progress::FnProgress;
//!
//! let mut store = SizeBucketStore::new();
//! store.append(FileRecord::new("a.jpg", 500));
//! store.append(FileRecord::new("b.jpg", 500));
//!
//! let progress = FnProgress::new(|done, total| println!("{done}/{total}"));
//! let resolution = resolve_with(&store, &Blake3Prefix::new(), &progress, &|| false).unwrap();
//! println!("{:?}", resolution.result.get(500));
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use rayon::prelude::*;

use super::result::{Resolution, ResolveStats, UniquenessResult};
use super::schedule::checksum_schedule;
use super::store::SizeBucketStore;
use crate::progress::{NoProgress, ProgressCallback};
use crate::scanner::{Blake3Prefix, Digest, FileRecord, HashError, PrefixChecksum};
use crate::signal::CancelToken;

/// Errors that abort a resolution run.
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    /// A record sits in a bucket whose key is not its size.
    #[error("{path} is {actual} bytes but is stored in the {bucket}-byte bucket")]
    BucketMismatch {
        /// Bucket key
        bucket: u64,
        /// Offending record
        path: PathBuf,
        /// The record's own size
        actual: u64,
    },

    /// The background worker thread could not be started.
    #[error("Failed to spawn resolution worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The background worker panicked before returning a result.
    #[error("Resolution worker panicked")]
    WorkerPanicked,
}

/// Configuration for a resolution run.
#[derive(Clone)]
pub struct ResolverConfig {
    /// Buckets resolved concurrently. 1 keeps the run strictly sequential.
    pub io_threads: usize,
    /// Optional token for cooperative cancellation.
    pub cancel: Option<CancelToken>,
    /// Optional progress sink.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("io_threads", &self.io_threads)
            .field("cancel", &self.cancel)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            io_threads: 1,
            cancel: None,
            progress_callback: None,
        }
    }
}

impl ResolverConfig {
    /// Set the number of buckets resolved at once.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// Resolves minimal prefix lengths for a [`SizeBucketStore`].
pub struct UniquenessResolver {
    config: ResolverConfig,
    checksum: Arc<dyn PrefixChecksum>,
}

impl UniquenessResolver {
    /// Create a resolver with an explicit digest implementation.
    #[must_use]
    pub fn new(checksum: Arc<dyn PrefixChecksum>, config: ResolverConfig) -> Self {
        Self { config, checksum }
    }

    /// Create a sequential resolver using BLAKE3 prefix digests.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(Blake3Prefix::new()), ResolverConfig::default())
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve every candidate bucket in `store`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::BucketMismatch`] if a record's size disagrees
    /// with its bucket key. Nothing is digested in that case.
    pub fn resolve(&self, store: &SizeBucketStore) -> Result<Resolution, ResolveError> {
        let no_progress = NoProgress;
        let progress: &dyn ProgressCallback = match self.config.progress_callback {
            Some(ref callback) => callback.as_ref(),
            None => &no_progress,
        };
        let should_cancel = self.config.cancel.clone().unwrap_or_default().as_predicate();

        run(
            store,
            self.checksum.as_ref(),
            progress,
            &should_cancel,
            self.config.io_threads,
        )
    }
}

/// Resolve `store` sequentially with explicit collaborators.
///
/// `progress` receives the candidate count once, then the cumulative count
/// of finished buckets. `should_cancel` is polled before every bucket and
/// every schedule step.
///
/// # Errors
///
/// Returns [`ResolveError::BucketMismatch`] if a record's size disagrees
/// with its bucket key.
pub fn resolve_with(
    store: &SizeBucketStore,
    checksum: &dyn PrefixChecksum,
    progress: &dyn ProgressCallback,
    should_cancel: &(dyn Fn() -> bool + Sync),
) -> Result<Resolution, ResolveError> {
    run(store, checksum, progress, should_cancel, 1)
}

/// How one bucket ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BucketOutcome {
    Resolved(u64),
    Exhausted,
    Cancelled,
}

/// What one bucket cost and produced.
#[derive(Debug)]
struct BucketReport {
    size: u64,
    outcome: BucketOutcome,
    digests: usize,
    bytes_read: u64,
    errors: Vec<HashError>,
}

/// Check that every candidate record sits under its own size.
fn validate(candidates: &[(u64, &[FileRecord])]) -> Result<(), ResolveError> {
    for (bucket, files) in candidates {
        if let Some(file) = files.iter().find(|f| f.size != *bucket) {
            log::error!(
                "Bucket invariant violated: {} ({} bytes) in bucket {}",
                file.path.display(),
                file.size,
                bucket
            );
            return Err(ResolveError::BucketMismatch {
                bucket: *bucket,
                path: file.path.clone(),
                actual: file.size,
            });
        }
    }
    Ok(())
}

/// Run the schedule for a single bucket.
fn resolve_bucket(
    size: u64,
    files: &[FileRecord],
    checksum: &dyn PrefixChecksum,
    should_cancel: &(dyn Fn() -> bool + Sync),
) -> BucketReport {
    let mut report = BucketReport {
        size,
        outcome: BucketOutcome::Exhausted,
        digests: 0,
        bytes_read: 0,
        errors: Vec::new(),
    };
    let mut digests: HashSet<Digest> = HashSet::with_capacity(files.len());

    for prefix_len in checksum_schedule(size) {
        if should_cancel() {
            log::debug!("Bucket {} cancelled before prefix {}", size, prefix_len);
            report.outcome = BucketOutcome::Cancelled;
            return report;
        }

        digests.clear();
        for file in files {
            match checksum.checksum(&file.path, prefix_len) {
                Ok(digest) => {
                    report.digests += 1;
                    report.bytes_read += prefix_len.min(file.size);
                    digests.insert(digest);
                }
                Err(e) => {
                    log::warn!("Failed to digest {}: {}", file.path.display(), e);
                    report.errors.push(e);
                }
            }
        }

        log::trace!(
            "Bucket {}: {} distinct digests of {} at prefix {}",
            size,
            digests.len(),
            files.len(),
            prefix_len
        );

        if digests.len() == files.len() {
            log::debug!("Bucket {} ({} files) resolved at {} bytes", size, files.len(), prefix_len);
            report.outcome = BucketOutcome::Resolved(prefix_len);
            return report;
        }
    }

    log::debug!("Bucket {} ({} files) exhausted its schedule", size, files.len());
    report
}

/// Fold one finished bucket into the running totals.
fn absorb(
    report: BucketReport,
    result: &mut UniquenessResult,
    stats: &mut ResolveStats,
    progress: &dyn ProgressCallback,
) {
    stats.finished_buckets += 1;
    stats.digests_computed += report.digests;
    stats.bytes_read += report.bytes_read;
    stats.errors.extend(report.errors);
    match report.outcome {
        BucketOutcome::Resolved(prefix_len) => {
            stats.resolved_buckets += 1;
            result.insert(report.size, prefix_len);
            progress.on_resolved(report.size, prefix_len);
        }
        BucketOutcome::Exhausted => stats.exhausted_buckets += 1,
        BucketOutcome::Cancelled => {}
    }
    progress.on_progress(stats.finished_buckets);
}

fn run(
    store: &SizeBucketStore,
    checksum: &dyn PrefixChecksum,
    progress: &dyn ProgressCallback,
    should_cancel: &(dyn Fn() -> bool + Sync),
    io_threads: usize,
) -> Result<Resolution, ResolveError> {
    let start = Instant::now();
    let candidates: Vec<(u64, &[FileRecord])> =
        store.iter().filter(|(_, files)| files.len() > 1).collect();
    validate(&candidates)?;

    let mut stats = ResolveStats {
        candidate_buckets: candidates.len(),
        candidate_files: candidates.iter().map(|(_, files)| files.len()).sum(),
        ..Default::default()
    };

    log::info!(
        "Resolving {} candidate buckets ({} files)",
        stats.candidate_buckets,
        stats.candidate_files
    );
    progress.on_total(candidates.len());

    let (result, mut stats, cancelled) = if io_threads > 1 && candidates.len() > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(io_threads)
            .thread_name(|i| format!("checksize-io-{i}"))
            .build()
        {
            Ok(pool) => pool.install(|| {
                run_parallel(&candidates, checksum, progress, should_cancel, stats)
            }),
            Err(e) => {
                log::warn!("Failed to build I/O pool ({}), resolving sequentially", e);
                run_sequential(&candidates, checksum, progress, should_cancel, stats)
            }
        }
    } else {
        run_sequential(&candidates, checksum, progress, should_cancel, stats)
    };

    stats.duration = start.elapsed();
    progress.on_finish(cancelled);

    if cancelled {
        log::info!(
            "Resolution cancelled after {}/{} buckets ({} resolved)",
            stats.finished_buckets,
            stats.candidate_buckets,
            stats.resolved_buckets
        );
    } else {
        log::info!(
            "Resolved {}/{} buckets in {:.2?} ({} digests, {} errors)",
            stats.resolved_buckets,
            stats.candidate_buckets,
            stats.duration,
            stats.digests_computed,
            stats.digest_errors()
        );
    }

    Ok(Resolution {
        result,
        cancelled,
        stats,
    })
}

fn run_sequential(
    candidates: &[(u64, &[FileRecord])],
    checksum: &dyn PrefixChecksum,
    progress: &dyn ProgressCallback,
    should_cancel: &(dyn Fn() -> bool + Sync),
    mut stats: ResolveStats,
) -> (UniquenessResult, ResolveStats, bool) {
    let mut result = UniquenessResult::new();

    for (size, files) in candidates {
        if should_cancel() {
            log::debug!("Cancellation requested before bucket {}", size);
            return (result, stats, true);
        }
        let report = resolve_bucket(*size, files, checksum, should_cancel);
        let was_cancelled = report.outcome == BucketOutcome::Cancelled;
        absorb(report, &mut result, &mut stats, progress);
        if was_cancelled {
            return (result, stats, true);
        }
    }

    (result, stats, false)
}

fn run_parallel(
    candidates: &[(u64, &[FileRecord])],
    checksum: &dyn PrefixChecksum,
    progress: &dyn ProgressCallback,
    should_cancel: &(dyn Fn() -> bool + Sync),
    stats: ResolveStats,
) -> (UniquenessResult, ResolveStats, bool) {
    // Bucket completions are folded under one lock so `done` stays monotonic.
    let shared = Mutex::new((UniquenessResult::new(), stats, false));

    candidates.par_iter().for_each(|(size, files)| {
        if should_cancel() {
            shared.lock().unwrap_or_else(PoisonError::into_inner).2 = true;
            return;
        }
        let report = resolve_bucket(*size, files, checksum, should_cancel);
        let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
        let (result, stats, cancelled) = &mut *guard;
        if report.outcome == BucketOutcome::Cancelled {
            *cancelled = true;
        }
        absorb(report, result, stats, progress);
    });

    shared.into_inner().unwrap_or_else(PoisonError::into_inner)
}
