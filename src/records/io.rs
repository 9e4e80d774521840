//! I/O operations for record files.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::records::data::{RecordSet, RECORDS_VERSION};

/// Errors raised while saving or loading a record file.
#[derive(thiserror::Error, Debug)]
pub enum RecordsError {
    /// Reading or writing the file failed.
    #[error("I/O error for record file {path}: {source}")]
    Io {
        /// Record file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The content is not a record envelope.
    #[error("Failed to parse record file. The file might be corrupted or in an old format: {0}")]
    Parse(#[source] serde_json::Error),

    /// Serializing the records failed.
    #[error("Failed to serialize records: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The stored checksum does not match the content.
    #[error("Record file integrity check failed: checksum mismatch. The file may have been tampered with or corrupted.")]
    Integrity,

    /// The file was written by an incompatible version.
    #[error("Unsupported record file version: {found}. Current version is {expected}.")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Version this build reads
        expected: u32,
    },
}

/// Envelope for record files to include integrity checks.
#[derive(Debug, Serialize, Deserialize)]
struct RecordsEnvelope {
    /// SHA256 checksum of the compact serialized record set.
    checksum: String,
    /// The record set itself.
    records: RecordSet,
}

fn checksum_of(set: &RecordSet) -> Result<String, serde_json::Error> {
    // Compact form, both when writing and when verifying.
    let compact = serde_json::to_string(set)?;
    let mut hasher = Sha256::new();
    hasher.update(compact.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

impl RecordSet {
    /// Serialize to pretty JSON wrapped in an integrity envelope.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::Serialize`] if serialization fails.
    pub fn to_json(&self) -> Result<String, RecordsError> {
        let checksum = checksum_of(self).map_err(RecordsError::Serialize)?;
        let envelope = RecordsEnvelope {
            checksum,
            records: self.clone(),
        };
        serde_json::to_string_pretty(&envelope).map_err(RecordsError::Serialize)
    }

    /// Parse and verify an enveloped record set.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::Parse`], [`RecordsError::Integrity`], or
    /// [`RecordsError::UnsupportedVersion`].
    pub fn from_json(content: &str) -> Result<Self, RecordsError> {
        let envelope: RecordsEnvelope =
            serde_json::from_str(content).map_err(RecordsError::Parse)?;

        let calculated = checksum_of(&envelope.records).map_err(RecordsError::Serialize)?;
        if calculated != envelope.checksum {
            return Err(RecordsError::Integrity);
        }

        let set = envelope.records;
        if set.version != RECORDS_VERSION {
            return Err(RecordsError::UnsupportedVersion {
                found: set.version,
                expected: RECORDS_VERSION,
            });
        }
        Ok(set)
    }

    /// Write the record set to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), RecordsError> {
        let json = self.to_json()?;
        let io_err = |source| RecordsError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::create(path).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        log::info!("Saved {} records to {}", self.len(), path.display());
        Ok(())
    }

    /// Read and verify a record set from `path`.
    ///
    /// Records whose file has since disappeared are kept; they surface later
    /// as digest errors.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] if the file is unreadable, malformed,
    /// tampered with, or from another format version.
    pub fn load(path: &Path) -> Result<Self, RecordsError> {
        let content = std::fs::read_to_string(path).map_err(|source| RecordsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let set = Self::from_json(&content)?;

        let missing = set.records.iter().filter(|r| !r.path.exists()).count();
        if missing > 0 {
            log::warn!(
                "{} of {} recorded files no longer exist",
                missing,
                set.records.len()
            );
        }
        log::debug!("Loaded {} records from {}", set.len(), path.display());

        Ok(set)
    }
}
