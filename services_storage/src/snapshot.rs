//! JSON snapshots of a filesystem tree

use crate::MemoryStorage;
use kernel_api::Node;
use thiserror::Error;

/// Errors restoring a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot root is not a directory")]
    RootNotDirectory,
}

impl MemoryStorage {
    /// Serializes the whole tree as JSON
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self.root())?)
    }

    /// Restores a tree from JSON produced by [`MemoryStorage::to_json`]
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        match serde_json::from_str::<Node>(json)? {
            Node::Directory(root) => Ok(MemoryStorage::from_root(root)),
            Node::File(_) => Err(SnapshotError::RootNotDirectory),
        }
    }
}
