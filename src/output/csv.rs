//! CSV output formatter.
//!
//! One row per candidate bucket, ordered by size.
//!
//! # Columns
//!
//! - `size`: File size in bytes
//! - `files`: Number of files sharing that size
//! - `prefix_len`: Minimal sufficient prefix length, empty if unresolved
//! - `fraction`: `prefix_len / size`, empty if unresolved
//! - `status`: `resolved` or `unresolved`

use std::io;

use serde::Serialize;
use thiserror::Error;

use super::RunReport;
use crate::uniqueness::StoreStats;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow {
    size: u64,
    files: usize,
    prefix_len: Option<u64>,
    fraction: Option<f64>,
    status: &'static str,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    report: &'a RunReport<'a>,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(report: &'a RunReport<'a>) -> Self {
        Self { report }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(["size", "files", "prefix_len", "fraction", "status"])?;

        let result = &self.report.resolution.result;
        for (size, files, prefix_len) in self.report.rows() {
            csv_writer.serialize(CsvRow {
                size,
                files,
                prefix_len,
                fraction: prefix_len.and_then(|_| result.fraction_of_size(size)),
                status: if prefix_len.is_some() {
                    "resolved"
                } else {
                    "unresolved"
                },
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Write folder statistics as a header row and a single data row.
///
/// # Errors
///
/// Returns `CsvOutputError` if writing or serialization fails.
pub fn write_stats<W: io::Write>(writer: W, stats: &StoreStats) -> Result<(), CsvOutputError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.serialize(stats)?;
    csv_writer.flush()?;
    Ok(())
}
