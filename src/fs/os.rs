//! Real filesystem backend.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use walkdir::WalkDir;

use super::{EntryKind, Filesystem, WalkEntry};

/// Filesystem backend over `std::fs`.
///
/// Atomic writes go through a temporary file created next to the target,
/// which is synced and then renamed over it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl OsFilesystem {
    /// Create a new backend.
    pub fn new() -> Self {
        Self
    }
}

impl Filesystem for OsFilesystem {
    fn stat(&self, path: &Path) -> io::Result<EntryKind> {
        let meta = fs::metadata(path)?;
        if meta.is_dir() {
            Ok(EntryKind::Dir)
        } else if meta.is_file() {
            Ok(EntryKind::File)
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file or directory: {}", path.display()),
            ))
        }
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            let kind = if entry.file_type().is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            entries.push(WalkEntry {
                path: entry.into_path(),
                kind,
            });
        }
        Ok(entries)
    }

    fn write_file_atomic(&self, path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".values-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(data)?;
        set_mode(tmp.as_file(), mode)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

#[cfg(unix)]
fn set_mode(file: &fs::File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &fs::File, _mode: u32) -> io::Result<()> {
    Ok(())
}
