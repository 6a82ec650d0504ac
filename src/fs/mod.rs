//! Filesystem backends.
//!
//! The propagator only needs a narrow view of the filesystem, so it is
//! written against [`Filesystem`] and runs unchanged on the real filesystem
//! ([`OsFilesystem`]) or on an in-memory tree ([`InMemoryFilesystem`]).

pub mod memory;
pub mod os;

use std::io;
use std::path::{Path, PathBuf};

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Dir,
}

/// Entry returned by [`Filesystem::walk`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct WalkEntry {
    /// Full path of the entry.
    pub path: PathBuf,
    /// Whether it is a file or a directory.
    pub kind: EntryKind,
}

/// Default permissions for written documents.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Trait for filesystem backends.
///
/// Implementations must return `walk` results in a deterministic order.
pub trait Filesystem {
    /// Kind of the entry at `path`. Missing entries are `NotFound` errors.
    fn stat(&self, path: &Path) -> io::Result<EntryKind>;

    /// Read a whole file.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// List `root` and every entry below it, sorted by path.
    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>>;

    /// Replace `path` with `data` so that readers never observe a partially
    /// written file.
    fn write_file_atomic(&self, path: &Path, data: &[u8], mode: u32) -> io::Result<()>;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// True when `path` is a regular file.
    fn is_file(&self, path: &Path) -> bool {
        matches!(self.stat(path), Ok(EntryKind::File))
    }
}

impl<F: Filesystem + ?Sized> Filesystem for &F {
    fn stat(&self, path: &Path) -> io::Result<EntryKind> {
        (**self).stat(path)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read_file(path)
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        (**self).walk(root)
    }

    fn write_file_atomic(&self, path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
        (**self).write_file_atomic(path, data, mode)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        (**self).remove_file(path)
    }
}

pub use memory::InMemoryFilesystem;
pub use os::OsFilesystem;
