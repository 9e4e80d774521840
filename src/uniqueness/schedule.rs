//! Checksum-size schedules.
//!
//! A schedule is the list of prefix lengths tried, in order, for one size
//! bucket. It starts at [`FLOOR_CHUNK`] and grows geometrically up to the
//! file size plus one floor chunk, so a bucket costs O(log size) digest
//! passes instead of O(size). The last element always covers the whole file,
//! which guarantees an answer for every bucket that is not made of exact
//! duplicates.
//!
//! The points are computed with `f64` `ln`/`exp` and rounded *down* to a
//! multiple of the floor chunk. Changing either detail changes which prefix
//! length is reported as minimal.

/// Minimum prefix length and rounding granularity, in bytes.
pub const FLOOR_CHUNK: u64 = 128;

/// Number of log-spaced points generated before the final full-size step.
pub const STEP_COUNT: usize = 5;

/// Build the schedule for a bucket of files that are `file_size` bytes long.
///
/// The result is strictly increasing, never empty, and always ends at
/// `file_size + FLOOR_CHUNK`.
///
/// # Examples
///
/// ```
/// use checksize::uniqueness::checksum_schedule;
///
/// assert_eq!(checksum_schedule(0), vec![128]);
/// assert_eq!(checksum_schedule(100), vec![128, 228]);
/// assert_eq!(checksum_schedule(500), vec![128, 256, 384, 512, 628]);
/// ```
#[must_use]
pub fn checksum_schedule(file_size: u64) -> Vec<u64> {
    let max_size = file_size.saturating_add(FLOOR_CHUNK);

    if max_size <= FLOOR_CHUNK * 2 {
        let mut schedule: Vec<u64> = [FLOOR_CHUNK, max_size]
            .into_iter()
            .filter(|&v| v <= max_size)
            .collect();
        schedule.dedup();
        return schedule;
    }

    let log_min = (FLOOR_CHUNK as f64).ln();
    let log_max = (max_size as f64).ln();
    let mut schedule: Vec<u64> = Vec::with_capacity(STEP_COUNT + 1);

    for i in 0..STEP_COUNT {
        let fraction = i as f64 / (STEP_COUNT - 1) as f64;
        let value = (log_min + fraction * (log_max - log_min))
            .exp()
            .max(FLOOR_CHUNK as f64);
        let rounded = (value as u64 / FLOOR_CHUNK) * FLOOR_CHUNK;
        if rounded <= max_size && schedule.last() != Some(&rounded) {
            schedule.push(rounded);
        }
    }

    if schedule.last().is_some_and(|&last| last < max_size) {
        schedule.push(max_size);
    }

    schedule
}
