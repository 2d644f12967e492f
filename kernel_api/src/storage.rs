//! Storage collaborator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A filesystem node: directories map names to nodes, files are strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    File(String),
    Directory(BTreeMap<String, Node>),
}

impl Node {
    /// Creates an empty directory
    pub fn empty_dir() -> Self {
        Node::Directory(BTreeMap::new())
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Node::File(_))
    }

    /// Returns the file contents if this is a file
    pub fn as_file(&self) -> Option<&str> {
        match self {
            Node::File(content) => Some(content.as_str()),
            Node::Directory(_) => None,
        }
    }

    /// Returns the entries if this is a directory
    pub fn as_dir(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Directory(entries) => Some(entries),
            Node::File(_) => None,
        }
    }
}

/// Storage errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{0}: no such file or directory")]
    NotFound(String),

    #[error("{0}: is a directory")]
    IsDirectory(String),

    #[error("{0}: not a directory")]
    NotADirectory(String),

    #[error("{0}: already exists")]
    AlreadyExists(String),

    #[error("{0}: permission denied")]
    PermissionDenied(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Virtual filesystem contract
///
/// Paths are absolute and slash-separated. Implementations do not apply
/// privilege checks; the shell decides what a caller may remove.
pub trait Storage {
    /// Reads the node at `path`
    fn read(&self, path: &str) -> Result<Node, StorageError>;

    /// Writes a file at `path`; the parent directory must exist
    fn write(&mut self, path: &str, content: &str) -> Result<(), StorageError>;

    /// Removes the node at `path` (recursively for directories)
    fn remove(&mut self, path: &str) -> Result<(), StorageError>;

    /// Creates a directory at `path`; the parent directory must exist
    fn mkdir(&mut self, path: &str) -> Result<(), StorageError>;

    /// Returns whether a node exists at `path`
    fn exists(&self, path: &str) -> bool {
        self.read(path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_json_shape() {
        let mut entries = BTreeMap::new();
        entries.insert("motd".to_string(), Node::File("hi".to_string()));
        let node = Node::Directory(entries);

        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"motd":"hi"}"#);

        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_node_accessors() {
        let file = Node::File("x".to_string());
        assert!(file.is_file());
        assert_eq!(file.as_file(), Some("x"));
        assert!(file.as_dir().is_none());
        assert!(Node::empty_dir().is_dir());
    }
}
