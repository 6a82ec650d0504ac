//! In-memory filesystem for testing.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::{EntryKind, Filesystem, WalkEntry, DEFAULT_FILE_MODE};

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, mode: u32 },
    Dir { read_only: bool },
}

/// In-memory filesystem for testing.
///
/// Uses a BTreeMap keyed by path for deterministic walk order. Directories
/// can be marked read-only to simulate permission failures.
#[derive(Debug, Default)]
pub struct InMemoryFilesystem {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
}

impl InMemoryFilesystem {
    /// Create a new empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory and all of its ancestors.
    pub fn create_dir_all(&self, path: impl AsRef<Path>) {
        let mut nodes = self.nodes.write();
        for dir in path.as_ref().ancestors() {
            if dir.as_os_str().is_empty() {
                continue;
            }
            nodes
                .entry(dir.to_path_buf())
                .or_insert(Node::Dir { read_only: false });
        }
    }

    /// Write a file directly, creating parent directories. Ignores
    /// read-only flags; meant for test setup.
    pub fn write_file(&self, path: impl AsRef<Path>, data: impl AsRef<[u8]>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent);
        }
        self.nodes.write().insert(
            path.to_path_buf(),
            Node::File {
                data: data.as_ref().to_vec(),
                mode: DEFAULT_FILE_MODE,
            },
        );
    }

    /// Mark a directory read-only (or writable again).
    pub fn set_read_only(&self, dir: impl AsRef<Path>, read_only: bool) {
        if let Some(Node::Dir { read_only: flag }) = self.nodes.write().get_mut(dir.as_ref()) {
            *flag = read_only;
        }
    }

    /// Permission bits of a file.
    pub fn mode(&self, path: impl AsRef<Path>) -> Option<u32> {
        match self.nodes.read().get(path.as_ref()) {
            Some(Node::File { mode, .. }) => Some(*mode),
            _ => None,
        }
    }

    /// Paths of all files, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.nodes
            .read()
            .iter()
            .filter(|(_, node)| matches!(node, Node::File { .. }))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn check_writable_parent(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> io::Result<()> {
        let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };
        match nodes.get(parent) {
            Some(Node::Dir { read_only: false }) => Ok(()),
            Some(Node::Dir { read_only: true }) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("read-only directory: {}", parent.display()),
            )),
            Some(Node::File { .. }) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a directory: {}", parent.display()),
            )),
            None => Err(not_found(parent)),
        }
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

impl Filesystem for InMemoryFilesystem {
    fn stat(&self, path: &Path) -> io::Result<EntryKind> {
        match self.nodes.read().get(path) {
            Some(Node::File { .. }) => Ok(EntryKind::File),
            Some(Node::Dir { .. }) => Ok(EntryKind::Dir),
            None => Err(not_found(path)),
        }
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.nodes.read().get(path) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Dir { .. }) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        let nodes = self.nodes.read();
        if nodes.get(root).is_none() {
            return Err(not_found(root));
        }
        Ok(nodes
            .iter()
            .filter(|(path, _)| path.starts_with(root))
            .map(|(path, node)| WalkEntry {
                path: path.clone(),
                kind: match node {
                    Node::File { .. } => EntryKind::File,
                    Node::Dir { .. } => EntryKind::Dir,
                },
            })
            .collect())
    }

    fn write_file_atomic(&self, path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
        let mut nodes = self.nodes.write();
        Self::check_writable_parent(&nodes, path)?;
        if let Some(Node::Dir { .. }) = nodes.get(path) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: {}", path.display()),
            ));
        }
        nodes.insert(
            path.to_path_buf(),
            Node::File {
                data: data.to_vec(),
                mode,
            },
        );
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.nodes.write();
        Self::check_writable_parent(&nodes, path)?;
        match nodes.get(path) {
            Some(Node::File { .. }) => {
                nodes.remove(path);
                Ok(())
            }
            Some(Node::Dir { .. }) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read() {
        let fs = InMemoryFilesystem::new();
        fs.create_dir_all("root/a");

        fs.write_file_atomic(Path::new("root/a/values.yaml"), b"x: 1\n", 0o600)
            .unwrap();

        assert_eq!(fs.read_file(Path::new("root/a/values.yaml")).unwrap(), b"x: 1\n");
        assert_eq!(fs.mode("root/a/values.yaml"), Some(0o600));
        assert_eq!(fs.stat(Path::new("root/a")).unwrap(), EntryKind::Dir);
        assert_eq!(fs.stat(Path::new("root")).unwrap(), EntryKind::Dir);
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let fs = InMemoryFilesystem::new();
        let err = fs
            .write_file_atomic(Path::new("nope/values.yaml"), b"", DEFAULT_FILE_MODE)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_read_only_dir_rejects_writes_and_removes() {
        let fs = InMemoryFilesystem::new();
        fs.write_file("grp/values.yaml", "a: 1\n");
        fs.set_read_only("grp", true);

        let err = fs
            .write_file_atomic(Path::new("grp/values.yaml"), b"a: 2\n", DEFAULT_FILE_MODE)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        let err = fs.remove_file(Path::new("grp/values.yaml")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(fs.read_file(Path::new("grp/values.yaml")).unwrap(), b"a: 1\n");
    }

    #[test]
    fn test_walk_is_scoped_and_sorted() {
        let fs = InMemoryFilesystem::new();
        fs.create_dir_all("root/b");
        fs.write_file("root/a/values.yaml", "k: v\n");
        fs.create_dir_all("other/c");

        let paths: Vec<_> = fs
            .walk(Path::new("root"))
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("root"),
                PathBuf::from("root/a"),
                PathBuf::from("root/a/values.yaml"),
                PathBuf::from("root/b"),
            ]
        );
        assert!(fs.walk(Path::new("missing")).is_err());
    }
}
