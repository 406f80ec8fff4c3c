//! Projection checkpoint persistence.
//!
//! The indexer writes the projection together with its sync cursor and the
//! set of watched pool contracts after every processed block range, so a
//! restart resumes where the previous run stopped instead of replaying
//! history.

use std::fs;
use std::io::Write;
use std::path::Path;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use super::store::ProjectionStore;

/// Default path for the projection snapshot file
pub const DEFAULT_SNAPSHOT_PATH: &str = "./projection.json";

/// Environment variable name for snapshot path configuration
pub const SNAPSHOT_PATH_ENV: &str = "PROJECTION_PATH";

#[derive(Debug)]
pub enum SnapshotError {
    ReadError { path: String, reason: String },
    WriteError { path: String, reason: String },
    ParseError { reason: String },
    SerializeError { reason: String },
    RenameError { from: String, to: String, reason: String },
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::ReadError { path, reason } => {
                write!(f, "Failed to read snapshot '{}': {}", path, reason)
            }
            SnapshotError::WriteError { path, reason } => {
                write!(f, "Failed to write snapshot '{}': {}", path, reason)
            }
            SnapshotError::ParseError { reason } => {
                write!(f, "Failed to parse snapshot JSON: {}", reason)
            }
            SnapshotError::SerializeError { reason } => {
                write!(f, "Failed to serialize snapshot: {}", reason)
            }
            SnapshotError::RenameError { from, to, reason } => {
                write!(f, "Failed to rename '{}' to '{}': {}", from, to, reason)
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

/// A pool contract the indexer is subscribed to, with the position of the
/// factory log that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedContract {
    pub address: Address,
    pub created_at_block: u64,
    pub created_at_log_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSnapshot {
    /// Highest block whose logs are fully reflected in `projection`
    pub last_synced_block: Option<u64>,
    pub watched: Vec<WatchedContract>,
    pub projection: ProjectionStore,
}

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub path: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_SNAPSHOT_PATH.to_string(),
        }
    }
}

impl SnapshotConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Loads and atomically saves [`ProjectionSnapshot`]s.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    config: SnapshotConfig,
}

impl SnapshotManager {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    pub fn path(&self) -> &str {
        &self.config.path
    }

    /// Load the snapshot. A missing file yields an empty snapshot; a
    /// corrupt one is an error.
    pub fn load(&self) -> Result<ProjectionSnapshot, SnapshotError> {
        let path = Path::new(&self.config.path);
        if !path.exists() {
            return Ok(ProjectionSnapshot::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| SnapshotError::ReadError {
            path: self.config.path.clone(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&contents).map_err(|e| SnapshotError::ParseError {
            reason: e.to_string(),
        })
    }

    /// Write-to-temp-then-rename so a crash never leaves a torn file.
    pub fn save(&self, snapshot: &ProjectionSnapshot) -> Result<(), SnapshotError> {
        let path = Path::new(&self.config.path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| SnapshotError::WriteError {
                    path: self.config.path.clone(),
                    reason: format!("Failed to create parent directories: {}", e),
                })?;
            }
        }

        let json = serde_json::to_string(snapshot).map_err(|e| SnapshotError::SerializeError {
            reason: e.to_string(),
        })?;

        let temp_path = format!("{}.tmp", self.config.path);
        let write_err = |e: std::io::Error| SnapshotError::WriteError {
            path: temp_path.clone(),
            reason: e.to_string(),
        };

        let mut file = fs::File::create(&temp_path).map_err(write_err)?;
        file.write_all(json.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;

        fs::rename(&temp_path, path).map_err(|e| SnapshotError::RenameError {
            from: temp_path.clone(),
            to: self.config.path.clone(),
            reason: e.to_string(),
        })?;

        Ok(())
    }
}
