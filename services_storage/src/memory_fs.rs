//! In-memory filesystem tree

use kernel_api::{normalize_path, Node, Storage, StorageError};
use std::collections::BTreeMap;

/// Message of the day seeded at `/etc/motd`
pub const DEFAULT_MOTD: &str = "Welcome to SimOS. Type 'help' to list commands.";

/// Virtual filesystem held entirely in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStorage {
    root: BTreeMap<String, Node>,
}

impl MemoryStorage {
    /// Creates an empty filesystem (only `/`)
    pub fn new() -> Self {
        Self {
            root: BTreeMap::new(),
        }
    }

    /// Creates a filesystem with the standard layout for `user`
    pub fn with_default_layout(user: &str) -> Self {
        let mut home = BTreeMap::new();
        home.insert(user.to_string(), Node::empty_dir());

        let mut etc = BTreeMap::new();
        etc.insert("motd".to_string(), Node::File(DEFAULT_MOTD.to_string()));

        let mut root = BTreeMap::new();
        root.insert("bin".to_string(), Node::empty_dir());
        root.insert("etc".to_string(), Node::Directory(etc));
        root.insert("home".to_string(), Node::Directory(home));
        root.insert("tmp".to_string(), Node::empty_dir());

        Self { root }
    }

    pub(crate) fn from_root(root: BTreeMap<String, Node>) -> Self {
        Self { root }
    }

    pub(crate) fn root(&self) -> &BTreeMap<String, Node> {
        &self.root
    }

    /// Number of entries directly under `/`
    pub fn root_len(&self) -> usize {
        self.root.len()
    }

    fn dir_mut(
        &mut self,
        components: &[String],
        path: &str,
    ) -> Result<&mut BTreeMap<String, Node>, StorageError> {
        let mut entries = &mut self.root;
        for component in components {
            entries = match entries.get_mut(component) {
                Some(Node::Directory(children)) => children,
                Some(Node::File(_)) => return Err(StorageError::NotADirectory(path.to_string())),
                None => return Err(StorageError::NotFound(path.to_string())),
            };
        }
        Ok(entries)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits an absolute path into normalized components
fn components(path: &str) -> Result<Vec<String>, StorageError> {
    if !path.starts_with('/') {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    let normalized = normalize_path("/", path);
    Ok(normalized
        .split('/')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

impl Storage for MemoryStorage {
    fn read(&self, path: &str) -> Result<Node, StorageError> {
        let components = components(path)?;
        let mut entries = &self.root;
        let Some((last, parents)) = components.split_last() else {
            return Ok(Node::Directory(self.root.clone()));
        };

        for component in parents {
            entries = match entries.get(component) {
                Some(Node::Directory(children)) => children,
                Some(Node::File(_)) => return Err(StorageError::NotADirectory(path.to_string())),
                None => return Err(StorageError::NotFound(path.to_string())),
            };
        }

        entries
            .get(last)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn write(&mut self, path: &str, content: &str) -> Result<(), StorageError> {
        let components = components(path)?;
        let Some((name, parents)) = components.split_last() else {
            return Err(StorageError::IsDirectory(path.to_string()));
        };

        let dir = self.dir_mut(parents, path)?;
        if let Some(Node::Directory(_)) = dir.get(name) {
            return Err(StorageError::IsDirectory(path.to_string()));
        }
        dir.insert(name.clone(), Node::File(content.to_string()));
        log::debug!("storage: wrote {} bytes to {}", content.len(), path);
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        let components = components(path)?;
        let Some((name, parents)) = components.split_last() else {
            log::warn!("storage: clearing root directory");
            self.root.clear();
            return Ok(());
        };

        let dir = self.dir_mut(parents, path)?;
        dir.remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn mkdir(&mut self, path: &str) -> Result<(), StorageError> {
        let components = components(path)?;
        let Some((name, parents)) = components.split_last() else {
            return Err(StorageError::AlreadyExists(path.to_string()));
        };

        let dir = self.dir_mut(parents, path)?;
        if dir.contains_key(name) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        dir.insert(name.clone(), Node::empty_dir());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let storage = MemoryStorage::with_default_layout("ada");
        assert!(storage.read("/bin").unwrap().is_dir());
        assert!(storage.read("/home/ada").unwrap().is_dir());
        assert!(storage.read("/tmp").unwrap().is_dir());
        assert_eq!(storage.read("/etc/motd").unwrap().as_file(), Some(DEFAULT_MOTD));
    }

    #[test]
    fn test_write_then_read() {
        let mut storage = MemoryStorage::with_default_layout("user");
        storage.write("/tmp/f", "hello").unwrap();
        assert_eq!(storage.read("/tmp/f").unwrap(), Node::File("hello".to_string()));

        storage.write("/tmp/f", "again").unwrap();
        assert_eq!(storage.read("/tmp/./f").unwrap().as_file(), Some("again"));
    }

    #[test]
    fn test_write_requires_parent() {
        let mut storage = MemoryStorage::with_default_layout("user");
        assert_eq!(
            storage.write("/nope/f", "x"),
            Err(StorageError::NotFound("/nope/f".to_string()))
        );
        assert_eq!(
            storage.write("/etc/motd/x", "x"),
            Err(StorageError::NotADirectory("/etc/motd/x".to_string()))
        );
    }

    #[test]
    fn test_write_onto_directory_fails() {
        let mut storage = MemoryStorage::with_default_layout("user");
        assert_eq!(
            storage.write("/tmp", "x"),
            Err(StorageError::IsDirectory("/tmp".to_string()))
        );
        assert!(matches!(storage.write("/", "x"), Err(StorageError::IsDirectory(_))));
    }

    #[test]
    fn test_relative_path_rejected() {
        let storage = MemoryStorage::new();
        assert!(matches!(storage.read("tmp"), Err(StorageError::InvalidPath(_))));
    }

    #[test]
    fn test_remove_file_and_directory() {
        let mut storage = MemoryStorage::with_default_layout("user");
        storage.write("/tmp/f", "x").unwrap();
        storage.remove("/tmp/f").unwrap();
        assert!(!storage.exists("/tmp/f"));

        storage.remove("/home").unwrap();
        assert!(!storage.exists("/home/user"));

        assert_eq!(
            storage.remove("/home"),
            Err(StorageError::NotFound("/home".to_string()))
        );
    }

    #[test]
    fn test_remove_root_clears_children() {
        let mut storage = MemoryStorage::with_default_layout("user");
        storage.remove("/").unwrap();
        assert_eq!(storage.root_len(), 0);
        assert!(storage.read("/").unwrap().is_dir());
    }

    #[test]
    fn test_mkdir() {
        let mut storage = MemoryStorage::with_default_layout("user");
        storage.mkdir("/tmp/work").unwrap();
        storage.write("/tmp/work/a", "1").unwrap();
        assert_eq!(
            storage.mkdir("/tmp/work"),
            Err(StorageError::AlreadyExists("/tmp/work".to_string()))
        );
        assert!(matches!(storage.mkdir("/x/y"), Err(StorageError::NotFound(_))));
    }
}
