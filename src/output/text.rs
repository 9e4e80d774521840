//! Human-readable output.

use std::io::{self, Write};
use std::path::Path;

use bytesize::ByteSize;
use yansi::Paint;

use super::RunReport;
use crate::uniqueness::StoreStats;

/// Text report for a resolution run.
///
/// With `quiet` set only the bucket table is printed.
pub struct TextOutput<'a> {
    report: &'a RunReport<'a>,
    quiet: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a text formatter.
    #[must_use]
    pub fn new(report: &'a RunReport<'a>, quiet: bool) -> Self {
        Self { report, quiet }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns any error from `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let report = self.report;
        let stats = &report.resolution.stats;

        if !self.quiet {
            write_store_stats(writer, report.source, &report.store_stats, report.scan_errors)?;
            writeln!(
                writer,
                "  {:<18} {} of {}",
                "Resolved:",
                stats.resolved_buckets.green(),
                report.store_stats.candidate_buckets
            )?;
            if !report.unresolved.is_empty() {
                writeln!(
                    writer,
                    "  {:<18} {}",
                    "Unresolved:",
                    report.unresolved.len().yellow()
                )?;
            }
            writeln!(
                writer,
                "  {:<18} {} ({} read, {:.1}% of candidate bytes)",
                "Digests:",
                stats.digests_computed,
                ByteSize::b(stats.bytes_read),
                stats.read_ratio(report.store_stats.candidate_bytes) * 100.0
            )?;
            if stats.digest_errors() > 0 {
                writeln!(
                    writer,
                    "  {:<18} {}",
                    "Digest errors:",
                    stats.digest_errors().red()
                )?;
            }
            writeln!(writer, "  {:<18} {:.2?}", "Duration:", stats.duration)?;
            if report.resolution.cancelled {
                writeln!(writer, "  {}", "Cancelled: results are partial".yellow().bold())?;
            }
            writeln!(writer)?;
        }

        let rows = report.rows();
        if rows.is_empty() {
            if !self.quiet {
                writeln!(writer, "No two files share a size; nothing to resolve.")?;
            }
            return Ok(());
        }

        writeln!(
            writer,
            "{}",
            format!("{:>14}  {:>6}  {:>10}  {:>8}", "SIZE", "FILES", "PREFIX", "RATIO").bold()
        )?;
        let result = &report.resolution.result;
        for (size, files, prefix) in rows {
            match prefix {
                Some(prefix_len) => {
                    let ratio = result
                        .fraction_of_size(size)
                        .map_or_else(|| "-".to_string(), |f| format!("{:.3}", f));
                    writeln!(writer, "{size:>14}  {files:>6}  {prefix_len:>10}  {ratio:>8}")?;
                }
                None => {
                    writeln!(
                        writer,
                        "{size:>14}  {files:>6}  {:>10}  {:>8}",
                        "unresolved".yellow(),
                        "-"
                    )?;
                }
            }
        }

        Ok(())
    }
}

/// Write folder statistics as an indented block.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_store_stats<W: Write>(
    writer: &mut W,
    source: &Path,
    stats: &StoreStats,
    scan_errors: usize,
) -> io::Result<()> {
    writeln!(writer, "{} {}", "checksize:".bold(), source.display())?;
    writeln!(
        writer,
        "  {:<18} {} ({})",
        "Files:",
        stats.total_files,
        stats.total_size_human()
    )?;
    writeln!(writer, "  {:<18} {}", "Distinct sizes:", stats.distinct_sizes)?;
    writeln!(writer, "  {:<18} {}", "Unique by size:", stats.unique_by_size)?;
    writeln!(
        writer,
        "  {:<18} {} ({} files, {})",
        "Candidate buckets:",
        stats.candidate_buckets.bold(),
        stats.candidate_files,
        stats.candidate_size_human()
    )?;
    if scan_errors > 0 {
        writeln!(writer, "  {:<18} {}", "Scan errors:", scan_errors.red())?;
    }
    Ok(())
}

/// Write a checksum schedule, one prefix length per line.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_schedule<W: Write>(writer: &mut W, size: u64, schedule: &[u64]) -> io::Result<()> {
    writeln!(
        writer,
        "{} {} bytes ({})",
        "Schedule for".bold(),
        size,
        ByteSize::b(size)
    )?;
    for (step, prefix_len) in schedule.iter().enumerate() {
        writeln!(writer, "  {:>2}. {:>14}  {}", step + 1, prefix_len, ByteSize::b(*prefix_len))?;
    }
    Ok(())
}
