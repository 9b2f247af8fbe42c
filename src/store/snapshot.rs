//! store::snapshot
//!
//! Read-only snapshot descriptor configuration.
//!
//! # Design
//!
//! A migration run reads from a point-in-time, read-only view of the source
//! store. The descriptor for that view is operator-supplied configuration,
//! opaque to the engine: a retention cutoff, connection parameters, and
//! blob-storage locations. Values are parsed from TOML and validated after
//! parsing; a descriptor that cannot name a connection is rejected before
//! any store is touched.
//!
//! # Example
//!
//! ```toml
//! before = "2016-03-16T12:00:00Z"
//! dsn = "dbname=teamspace host=/var/postgres port=5432"
//! blob_dir = "/var/blobstorage"
//! shared_blob_dir = true
//! pack_gc = true
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from snapshot descriptor handling.
#[derive(Debug, Error)]
pub enum SnapshotConfigError {
    /// Failed to read the descriptor file.
    #[error("failed to read snapshot descriptor: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the descriptor.
    #[error("failed to parse snapshot descriptor: {0}")]
    Parse(#[from] toml::de::Error),

    /// A descriptor value is invalid or missing.
    #[error("invalid snapshot descriptor: {0}")]
    InvalidValue(String),
}

/// Descriptor of a read-only source snapshot.
///
/// Opaque to engine logic; only [`SnapshotConfig::validate`] inspects it,
/// and only to decide whether a connection can be attempted at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Retention cutoff: the snapshot reflects the store as of this
    /// instant.
    pub before: Option<DateTime<Utc>>,

    /// Connection parameters for the underlying storage.
    pub dsn: Option<String>,

    /// Blob storage directory.
    pub blob_dir: Option<PathBuf>,

    /// Whether the blob directory is shared with the live deployment.
    pub shared_blob_dir: Option<bool>,

    /// Whether the storage should garbage-collect while packing.
    pub pack_gc: Option<bool>,
}

impl SnapshotConfig {
    /// Parse a descriptor from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, SnapshotConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a descriptor from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SnapshotConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate the descriptor values.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotConfigError::InvalidValue` if no DSN is configured
    /// or a configured value is unusable.
    pub fn validate(&self) -> Result<(), SnapshotConfigError> {
        match &self.dsn {
            None => {
                return Err(SnapshotConfigError::InvalidValue(
                    "dsn is required to open a snapshot".to_string(),
                ))
            }
            Some(dsn) if dsn.trim().is_empty() => {
                return Err(SnapshotConfigError::InvalidValue(
                    "dsn cannot be empty".to_string(),
                ))
            }
            Some(_) => {}
        }

        if let Some(blob_dir) = &self.blob_dir {
            if blob_dir.as_os_str().is_empty() {
                return Err(SnapshotConfigError::InvalidValue(
                    "blob_dir cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
