//! Saved file records.
//!
//! Discovery on a large media library is slow, so a scan can write its
//! records to disk and later runs can resolve straight from that file.
//!
//! # Features
//!
//! * **Integrity**: each file is wrapped in an envelope with a SHA256 checksum.
//! * **Versioning**: unknown format versions are rejected on load.
//! * **Portability**: plain, human-readable JSON.
//!
//! # Architecture
//!
//! * [`data`]: the serializable [`RecordSet`] and the scan settings it records.
//! * [`io`]: saving, loading and verifying record files.

pub mod data;
pub mod io;

pub use data::{RecordSet, RecordSettings, RECORDS_VERSION};
pub use io::RecordsError;
