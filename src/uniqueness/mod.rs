//! Size buckets and minimal-prefix resolution.
//!
//! # Overview
//!
//! Deduplication tools avoid hashing whole files by first comparing short
//! prefixes. This module answers the question that makes that cheap: for each
//! group of same-size files, what is the shortest prefix whose digest already
//! tells every member apart?
//!
//! # Architecture
//!
//! * [`schedule`]: logarithmic prefix-length schedule per file size
//! * [`store`]: records bucketed by exact size
//! * [`resolver`]: drives the schedule per bucket, with progress and
//!   cancellation
//! * [`result`]: the `size -> prefix length` map and run counters
//! * [`stats`]: folder statistics that need no hashing
//!
//! # Example
//!
//! ```no_run
//! use checksize::scanner::{Walker, WalkerConfig};
//! use checksize::uniqueness::{SizeBucketStore, UniquenessResolver};
//! use std::path::Path;
//!
//! let discovery = Walker::new(Path::new("."), WalkerConfig::default()).discover();
//! let store: SizeBucketStore = discovery.records.into_iter().collect();
//!
//! let resolution = UniquenessResolver::with_defaults().resolve(&store).unwrap();
//! for (size, prefix) in resolution.result.sorted() {
//!     println!("{size} bytes -> {prefix} byte prefix");
//! }
//! ```

pub mod resolver;
pub mod result;
pub mod schedule;
pub mod stats;
pub mod store;

pub use resolver::{resolve_with, ResolveError, ResolverConfig, UniquenessResolver};
pub use result::{Resolution, ResolveStats, UniquenessResult};
pub use schedule::{checksum_schedule, FLOOR_CHUNK, STEP_COUNT};
pub use stats::StoreStats;
pub use store::SizeBucketStore;
