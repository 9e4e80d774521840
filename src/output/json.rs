//! JSON output formatter.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "source": "/photos",
//!   "buckets": [
//!     { "size": 1024, "files": 2, "prefix_len": 128, "fraction": 0.125 }
//!   ],
//!   "unresolved": [ { "size": 4096, "files": 3 } ],
//!   "distribution": { "128": 1 },
//!   "summary": {
//!     "total_files": 100,
//!     "candidate_buckets": 2,
//!     "resolved_buckets": 1,
//!     "cancelled": false,
//!     "exit_code": 0,
//!     "exit_code_name": "CS000"
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use super::RunReport;
use crate::uniqueness::StoreStats;

/// One resolved bucket.
#[derive(Debug, Clone, Serialize)]
pub struct JsonBucket {
    /// File size in bytes
    pub size: u64,
    /// Files sharing that size
    pub files: usize,
    /// Minimal sufficient prefix length in bytes
    pub prefix_len: u64,
    /// `prefix_len / size`, absent for zero-length files
    pub fraction: Option<f64>,
}

/// One candidate bucket that did not resolve.
#[derive(Debug, Clone, Serialize)]
pub struct JsonUnresolved {
    /// File size in bytes
    pub size: u64,
    /// Files sharing that size
    pub files: usize,
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Total number of files discovered
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_bytes: u64,
    /// Distinct file sizes
    pub distinct_sizes: usize,
    /// Buckets with two or more files
    pub candidate_buckets: usize,
    /// Files in candidate buckets
    pub candidate_files: usize,
    /// Bytes in candidate buckets
    pub candidate_bytes: u64,
    /// Buckets processed before the run ended
    pub finished_buckets: usize,
    /// Buckets that became distinguishable
    pub resolved_buckets: usize,
    /// Buckets that exhausted their schedule
    pub exhausted_buckets: usize,
    /// Successful digest computations
    pub digests_computed: usize,
    /// Bytes fed to digests
    pub bytes_read: u64,
    /// `bytes_read / candidate_bytes`
    pub read_ratio: f64,
    /// Files that could not be digested, counted per attempt
    pub digest_errors: usize,
    /// Entries the walker could not read
    pub scan_errors: usize,
    /// Resolution time in milliseconds
    pub duration_ms: u64,
    /// Whether the run was cancelled
    pub cancelled: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "CS000")
    pub exit_code_name: String,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Scanned directory or record file
    pub source: String,
    /// Resolved buckets, ascending by size
    pub buckets: Vec<JsonBucket>,
    /// Unresolved candidate buckets, ascending by size
    pub unresolved: Vec<JsonUnresolved>,
    /// Prefix length -> number of buckets resolved at it
    pub distribution: BTreeMap<u64, usize>,
    /// Run statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the JSON view of a run.
    #[must_use]
    pub fn new(report: &RunReport<'_>) -> Self {
        let result = &report.resolution.result;
        let stats = &report.resolution.stats;
        let store_stats = &report.store_stats;

        let mut buckets = Vec::new();
        let mut unresolved = Vec::new();
        for (size, files, prefix) in report.rows() {
            match prefix {
                Some(prefix_len) => buckets.push(JsonBucket {
                    size,
                    files,
                    prefix_len,
                    fraction: result.fraction_of_size(size),
                }),
                None => unresolved.push(JsonUnresolved { size, files }),
            }
        }

        Self {
            source: path_string(report.source),
            buckets,
            unresolved,
            distribution: result.distribution(),
            summary: JsonSummary {
                total_files: store_stats.total_files,
                total_bytes: store_stats.total_bytes,
                distinct_sizes: store_stats.distinct_sizes,
                candidate_buckets: store_stats.candidate_buckets,
                candidate_files: store_stats.candidate_files,
                candidate_bytes: store_stats.candidate_bytes,
                finished_buckets: stats.finished_buckets,
                resolved_buckets: stats.resolved_buckets,
                exhausted_buckets: stats.exhausted_buckets,
                digests_computed: stats.digests_computed,
                bytes_read: stats.bytes_read,
                read_ratio: stats.read_ratio(store_stats.candidate_bytes),
                digest_errors: stats.digest_errors(),
                scan_errors: report.scan_errors,
                duration_ms: stats.duration.as_millis() as u64,
                cancelled: report.resolution.cancelled,
                exit_code: report.exit_code.as_i32(),
                exit_code_name: report.exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

/// JSON view of folder statistics.
#[derive(Debug, Clone, Serialize)]
pub struct JsonStats {
    /// Scanned directory
    pub source: String,
    /// The statistics
    #[serde(flatten)]
    pub stats: StoreStats,
    /// Entries the walker could not read
    pub scan_errors: usize,
}

impl JsonStats {
    /// Wrap statistics for output.
    #[must_use]
    pub fn new(source: &Path, stats: StoreStats, scan_errors: usize) -> Self {
        Self {
            source: path_string(source),
            stats,
            scan_errors,
        }
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

fn write_json<T: Serialize, W: Write>(
    value: &T,
    writer: &mut W,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Absolute path string where possible.
fn path_string(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
