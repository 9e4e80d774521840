//! Prefix digests.
//!
//! # Overview
//!
//! The resolver never reads files itself. It asks a [`PrefixChecksum`] for a
//! digest of the first `k` bytes of a file and only compares the results.
//! [`Blake3Prefix`] is the implementation used by the binary; tests inject
//! their own to count calls or simulate unreadable files.
//!
//! # Example
//!
//! ```no_run
//! use checksize::scanner::{Blake3Prefix, PrefixChecksum};
//! use std::path::Path;
//!
//! let hasher = Blake3Prefix::new();
//! let head = hasher.checksum(Path::new("photo.jpg"), 128).unwrap();
//! println!("{}", checksize::scanner::digest_to_hex(&head));
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::HashError;

/// A 32-byte content digest.
pub type Digest = [u8; 32];

/// Read buffer used when streaming a prefix into the hasher.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Computes a digest over a file's leading bytes.
///
/// Implementations must be deterministic, must depend only on the first
/// `min(prefix_len, file_len)` bytes, and must give equal digests for equal
/// prefixes.
pub trait PrefixChecksum: Send + Sync {
    /// Digest the first `prefix_len` bytes of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the file cannot be opened or read.
    fn checksum(&self, path: &Path, prefix_len: u64) -> Result<Digest, HashError>;
}

/// BLAKE3 over a file prefix.
///
/// Every call re-opens the file and streams the prefix from offset zero;
/// nothing is carried over between calls.
#[derive(Debug, Clone, Default)]
pub struct Blake3Prefix;

impl Blake3Prefix {
    /// Create a new prefix hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Digest the first `prefix_len` bytes of any reader.
    ///
    /// # Errors
    ///
    /// Propagates read errors from `reader`.
    pub fn digest_reader<R: Read>(reader: R, prefix_len: u64) -> std::io::Result<Digest> {
        let mut limited = BufReader::with_capacity(READ_BUFFER_SIZE, reader).take(prefix_len);
        let mut hasher = blake3::Hasher::new();
        std::io::copy(&mut limited, &mut hasher)?;
        Ok(*hasher.finalize().as_bytes())
    }
}

impl PrefixChecksum for Blake3Prefix {
    fn checksum(&self, path: &Path, prefix_len: u64) -> Result<Digest, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let digest =
            Self::digest_reader(file, prefix_len).map_err(|e| HashError::from_io(path, e))?;
        log::trace!("Digested {} bytes of {}", prefix_len, path.display());
        Ok(digest)
    }
}

/// Render a digest as lowercase hex.
#[must_use]
pub fn digest_to_hex(digest: &Digest) -> String {
    blake3::Hash::from(*digest).to_hex().to_string()
}
