//! File-based extraction between sibling `values.yaml` documents.
//!
//! A sibling group is a set of `<parent>/<child>/values.yaml` files sharing
//! the same `<parent>`. Extracting the group writes the shared structure to
//! `<parent>/values.yaml` and rewrites every child with its remainder, so the
//! Helm chain `parent, child` still evaluates to the original values.
//!
//! ## Write discipline
//!
//! Every file is replaced through [`Filesystem::write_file_atomic`]. The
//! common document is written first, then each remainder. When any write
//! fails, the files already written in the group are restored to their
//! previous bytes (or removed when they did not exist before), so a failing
//! group leaves no partial effect.
//!
//! ## Errors
//!
//! [`FilesError::NoCommon`] is the normal "nothing to do" outcome; callers
//! are expected to check [`FilesError::is_no_common`] and carry on.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use crate::codec::{Codec, CodecError, YamlCodec};
use crate::extract::{extract_common, extract_common_n, ExtractError};
use crate::fs::{EntryKind, Filesystem, OsFilesystem, DEFAULT_FILE_MODE};
use crate::merge::merge;
use crate::types::{ExtractOptions, TreeValue};

/// Name of every document handled by the file-based operations.
pub const VALUES_FILE_NAME: &str = "values.yaml";

/// Error type for file-based extraction.
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// The documents share nothing; no file was touched.
    #[error("no common values found")]
    NoCommon,

    /// Input file is not named `values.yaml`.
    #[error("file must be named values.yaml: {}", .0.display())]
    InvalidFileName(PathBuf),

    /// Input path is a directory.
    #[error("path is a directory, expected file: {}", .0.display())]
    NotAFile(PathBuf),

    /// Inputs do not share the same parent directory one level up.
    #[error(
        "all files must share the same parent directory: got {} vs {}",
        .expected.display(),
        .found.display()
    )]
    NotSiblings {
        /// Parent of the first input.
        expected: PathBuf,
        /// Parent of the offending input.
        found: PathBuf,
    },

    /// Input has no directory above its own to receive the common document.
    #[error("file has no parent directory to extract into: {}", .0.display())]
    NoParent(PathBuf),

    /// Fewer than two inputs.
    #[error("need at least 2 files, got {got}")]
    TooFewFiles {
        /// Number of inputs supplied.
        got: usize,
    },

    /// The same input was listed twice.
    #[error("file listed more than once: {}", .0.display())]
    DuplicatePath(PathBuf),

    /// Recursive root is not a directory.
    #[error("root is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    /// A document could not be parsed.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Underlying codec error.
        #[source]
        source: CodecError,
    },

    /// A file or directory could not be accessed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A computed document could not be serialized.
    #[error("failed to serialize document: {0}")]
    Serialize(#[source] CodecError),
}

impl FilesError {
    /// True for the expected "nothing shared" outcome.
    pub fn is_no_common(&self) -> bool {
        matches!(self, FilesError::NoCommon)
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        FilesError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<ExtractError> for FilesError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::TooFewDocuments { got } => FilesError::TooFewFiles { got },
        }
    }
}

/// Outcome of a committed sibling group.
#[derive(Debug, Clone)]
pub(crate) struct GroupCommit {
    pub common_path: PathBuf,
    pub fingerprint: String,
    pub merged_into_existing: bool,
}

/// A document read from disk.
struct Loaded {
    path: PathBuf,
    bytes: Vec<u8>,
    value: TreeValue,
}

/// One pending write and what to restore if the group fails.
struct PendingWrite {
    path: PathBuf,
    data: Vec<u8>,
    previous: Option<Vec<u8>>,
}

/// File-based extraction over a [`Filesystem`].
///
/// ```no_run
/// use values_extract::{OsFilesystem, ValuesFiles};
///
/// let files = ValuesFiles::new(OsFilesystem::new());
/// match files.extract_common("apps/a/values.yaml", "apps/b/values.yaml") {
///     Ok(common) => println!("wrote {}", common.display()),
///     Err(e) if e.is_no_common() => println!("nothing shared"),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ValuesFiles<F, C = YamlCodec> {
    pub(crate) fs: F,
    pub(crate) codec: C,
    pub(crate) options: ExtractOptions,
}

impl<F: Filesystem> ValuesFiles<F> {
    /// Create with the YAML codec and default options.
    pub fn new(fs: F) -> Self {
        Self::with_codec(fs, YamlCodec)
    }
}

impl<F: Filesystem, C: Codec> ValuesFiles<F, C> {
    /// Create with an explicit codec.
    pub fn with_codec(fs: F, codec: C) -> Self {
        Self {
            fs,
            codec,
            options: ExtractOptions::default(),
        }
    }

    /// Replace the extraction options.
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Current extraction options.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Underlying filesystem.
    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    /// Extract the common structure of two sibling files into their shared
    /// parent and rewrite both with their remainders.
    ///
    /// Returns the path of the common document.
    pub fn extract_common(
        &self,
        a: impl AsRef<Path>,
        b: impl AsRef<Path>,
    ) -> Result<PathBuf, FilesError> {
        let inputs = [a.as_ref(), b.as_ref()];
        let parent = self.validate(&inputs)?;
        let mut docs = self.load_all(&inputs)?;

        let pair = extract_common(&docs[0].value, &docs[1].value, &self.options);
        if pair.is_common_empty() {
            tracing::debug!(parent = %parent.display(), "No common values between pair");
            return Err(FilesError::NoCommon);
        }

        docs[0].value = pair.remainder_a;
        docs[1].value = pair.remainder_b;
        Ok(self.commit(&parent, pair.common, docs)?.common_path)
    }

    /// Same as [`extract_common`](Self::extract_common) for N siblings.
    pub fn extract_common_n<P: AsRef<Path>>(&self, paths: &[P]) -> Result<PathBuf, FilesError> {
        let inputs: Vec<&Path> = paths.iter().map(AsRef::as_ref).collect();
        Ok(self.extract_group(&inputs)?.common_path)
    }

    pub(crate) fn extract_group(&self, inputs: &[&Path]) -> Result<GroupCommit, FilesError> {
        let parent = self.validate(inputs)?;
        let mut docs = self.load_all(inputs)?;

        let values: Vec<TreeValue> = docs.iter().map(|d| d.value.clone()).collect();
        let extraction = extract_common_n(&values, &self.options)?;
        if extraction.is_common_empty() {
            tracing::debug!(
                parent = %parent.display(),
                files = inputs.len(),
                "No common values in group"
            );
            return Err(FilesError::NoCommon);
        }

        for (doc, remainder) in docs.iter_mut().zip(extraction.remainders) {
            doc.value = remainder;
        }
        self.commit(&parent, extraction.common, docs)
    }

    /// Check names, existence and sibling layout. Returns the shared parent.
    fn validate(&self, inputs: &[&Path]) -> Result<PathBuf, FilesError> {
        if inputs.len() < 2 {
            return Err(FilesError::TooFewFiles { got: inputs.len() });
        }

        let mut seen = BTreeSet::new();
        for path in inputs {
            if path.file_name().map_or(true, |n| n != VALUES_FILE_NAME) {
                return Err(FilesError::InvalidFileName(path.to_path_buf()));
            }
            if !seen.insert(*path) {
                return Err(FilesError::DuplicatePath(path.to_path_buf()));
            }
        }

        for path in inputs {
            match self.fs.stat(path) {
                Ok(EntryKind::File) => {}
                Ok(EntryKind::Dir) => return Err(FilesError::NotAFile(path.to_path_buf())),
                Err(e) => return Err(FilesError::io(path, e)),
            }
        }

        let mut parent: Option<&Path> = None;
        for path in inputs {
            let grandparent = path
                .parent()
                .and_then(Path::parent)
                .ok_or_else(|| FilesError::NoParent(path.to_path_buf()))?;
            match parent {
                None => parent = Some(grandparent),
                Some(expected) if expected != grandparent => {
                    return Err(FilesError::NotSiblings {
                        expected: expected.to_path_buf(),
                        found: grandparent.to_path_buf(),
                    })
                }
                Some(_) => {}
            }
        }

        parent
            .map(Path::to_path_buf)
            .ok_or(FilesError::TooFewFiles { got: 0 })
    }

    fn load_all(&self, inputs: &[&Path]) -> Result<Vec<Loaded>, FilesError> {
        inputs.iter().map(|path| self.load(path)).collect()
    }

    fn load(&self, path: &Path) -> Result<Loaded, FilesError> {
        let bytes = self
            .fs
            .read_file(path)
            .map_err(|e| FilesError::io(path, e))?;
        let value = self.codec.parse(&bytes).map_err(|source| FilesError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Loaded {
            path: path.to_path_buf(),
            bytes,
            value,
        })
    }

    /// Existing document at `path`, if any.
    fn load_existing(&self, path: &Path) -> Result<Option<Loaded>, FilesError> {
        match self.fs.stat(path) {
            Ok(EntryKind::File) => self.load(path).map(Some),
            Ok(EntryKind::Dir) => Err(FilesError::NotAFile(path.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FilesError::io(path, e)),
        }
    }

    /// Write the common document and the remainders of one group.
    fn commit(
        &self,
        parent: &Path,
        common: TreeValue,
        remainders: Vec<Loaded>,
    ) -> Result<GroupCommit, FilesError> {
        let common_path = parent.join(VALUES_FILE_NAME);
        let existing = self.load_existing(&common_path)?;
        let merged_into_existing = existing.is_some();

        let (common, previous) = match existing {
            Some(doc) => (merge(&doc.value, &common), Some(doc.bytes)),
            None => (common, None),
        };
        let fingerprint = common
            .fingerprint()
            .map_err(|e| FilesError::Serialize(CodecError::Json(e)))?;

        let mut writes = Vec::with_capacity(remainders.len() + 1);
        writes.push(PendingWrite {
            data: self.serialize(&common)?,
            path: common_path.clone(),
            previous,
        });
        for doc in remainders {
            writes.push(PendingWrite {
                data: self.serialize(&doc.value)?,
                path: doc.path,
                previous: Some(doc.bytes),
            });
        }

        self.write_all_or_nothing(&writes)?;

        tracing::info!(
            common = %common_path.display(),
            children = writes.len() - 1,
            fingerprint = %fingerprint,
            merged_into_existing,
            "Extracted common values"
        );

        Ok(GroupCommit {
            common_path,
            fingerprint,
            merged_into_existing,
        })
    }

    fn serialize(&self, value: &TreeValue) -> Result<Vec<u8>, FilesError> {
        self.codec.serialize(value).map_err(FilesError::Serialize)
    }

    fn write_all_or_nothing(&self, writes: &[PendingWrite]) -> Result<(), FilesError> {
        for (done, write) in writes.iter().enumerate() {
            if let Err(e) = self
                .fs
                .write_file_atomic(&write.path, &write.data, DEFAULT_FILE_MODE)
            {
                tracing::warn!(
                    path = %write.path.display(),
                    error = %e,
                    rolled_back = done,
                    "Write failed, rolling back group"
                );
                self.roll_back(&writes[..done]);
                return Err(FilesError::io(&write.path, e));
            }
        }
        Ok(())
    }

    fn roll_back(&self, written: &[PendingWrite]) {
        for write in written.iter().rev() {
            let restored = match &write.previous {
                Some(bytes) => self
                    .fs
                    .write_file_atomic(&write.path, bytes, DEFAULT_FILE_MODE),
                None => self.fs.remove_file(&write.path),
            };
            if let Err(e) = restored {
                tracing::error!(
                    path = %write.path.display(),
                    error = %e,
                    "Failed to restore file during rollback"
                );
            }
        }
    }
}

/// Extract the common structure of two sibling `values.yaml` files on disk.
pub fn extract_common_files(
    a: impl AsRef<Path>,
    b: impl AsRef<Path>,
    options: ExtractOptions,
) -> Result<PathBuf, FilesError> {
    ValuesFiles::new(OsFilesystem::new())
        .with_options(options)
        .extract_common(a, b)
}

/// Extract the common structure of N sibling `values.yaml` files on disk.
pub fn extract_common_files_n<P: AsRef<Path>>(
    paths: &[P],
    options: ExtractOptions,
) -> Result<PathBuf, FilesError> {
    ValuesFiles::new(OsFilesystem::new())
        .with_options(options)
        .extract_common_n(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFilesystem;

    fn read(fs: &InMemoryFilesystem, path: &str) -> TreeValue {
        YamlCodec.parse(&fs.read_file(Path::new(path)).unwrap()).unwrap()
    }

    fn yaml(text: &str) -> TreeValue {
        YamlCodec.parse(text.as_bytes()).unwrap()
    }

    fn setup_pair() -> InMemoryFilesystem {
        let fs = InMemoryFilesystem::new();
        fs.write_file("apps/a/values.yaml", "image: nginx\nport: 80\n");
        fs.write_file("apps/b/values.yaml", "image: nginx\nport: 81\n");
        fs
    }

    #[test]
    fn test_pair_writes_common_and_remainders() {
        let fs = setup_pair();
        let files = ValuesFiles::new(&fs);

        let common = files
            .extract_common("apps/a/values.yaml", "apps/b/values.yaml")
            .unwrap();

        assert_eq!(common, PathBuf::from("apps/values.yaml"));
        assert_eq!(read(&fs, "apps/values.yaml"), yaml("image: nginx\n"));
        assert_eq!(read(&fs, "apps/a/values.yaml"), yaml("port: 80\n"));
        assert_eq!(read(&fs, "apps/b/values.yaml"), yaml("port: 81\n"));
        assert_eq!(fs.mode("apps/values.yaml"), Some(DEFAULT_FILE_MODE));
    }

    #[test]
    fn test_rewritten_children_keep_large_integers() {
        let fs = InMemoryFilesystem::new();
        fs.write_file("apps/a/values.yaml", "image: nginx\nbig: 18446744073709551615\n");
        fs.write_file("apps/b/values.yaml", "image: nginx\nbig: 1\n");

        ValuesFiles::new(&fs)
            .extract_common("apps/a/values.yaml", "apps/b/values.yaml")
            .unwrap();

        assert_eq!(
            fs.read_file(Path::new("apps/a/values.yaml")).unwrap(),
            b"big: 18446744073709551615\n"
        );
    }

    #[test]
    fn test_no_common_leaves_files_untouched() {
        let fs = InMemoryFilesystem::new();
        fs.write_file("apps/a/values.yaml", "x: 1\n");
        fs.write_file("apps/b/values.yaml", "y: 2\n");

        let err = ValuesFiles::new(&fs)
            .extract_common("apps/a/values.yaml", "apps/b/values.yaml")
            .unwrap_err();

        assert!(err.is_no_common());
        assert_eq!(fs.read_file(Path::new("apps/a/values.yaml")).unwrap(), b"x: 1\n");
        assert_eq!(fs.read_file(Path::new("apps/b/values.yaml")).unwrap(), b"y: 2\n");
        assert!(!fs.is_file(Path::new("apps/values.yaml")));
    }

    #[test]
    fn test_validation_errors() {
        let fs = setup_pair();
        fs.write_file("apps/c/other.yaml", "image: nginx\n");
        fs.write_file("elsewhere/d/values.yaml", "image: nginx\n");
        fs.create_dir_all("apps/dir/values.yaml");
        let files = ValuesFiles::new(&fs);

        assert!(matches!(
            files.extract_common("apps/a/values.yaml", "apps/c/other.yaml"),
            Err(FilesError::InvalidFileName(_))
        ));
        assert!(matches!(
            files.extract_common("apps/a/values.yaml", "elsewhere/d/values.yaml"),
            Err(FilesError::NotSiblings { .. })
        ));
        assert!(matches!(
            files.extract_common("apps/a/values.yaml", "apps/dir/values.yaml"),
            Err(FilesError::NotAFile(_))
        ));
        assert!(matches!(
            files.extract_common("apps/a/values.yaml", "apps/a/values.yaml"),
            Err(FilesError::DuplicatePath(_))
        ));
        assert!(matches!(
            files.extract_common("apps/a/values.yaml", "apps/missing/values.yaml"),
            Err(FilesError::Io { .. })
        ));
        assert!(matches!(
            files.extract_common_n(&["apps/a/values.yaml"]),
            Err(FilesError::TooFewFiles { got: 1 })
        ));
        assert!(matches!(
            files.extract_common_n::<&str>(&[]),
            Err(FilesError::TooFewFiles { got: 0 })
        ));
    }

    #[test]
    fn test_different_depths_are_not_siblings() {
        let fs = InMemoryFilesystem::new();
        fs.write_file("root/a/values.yaml", "k: v\n");
        fs.write_file("root/x/a/values.yaml", "k: v\n");

        let err = ValuesFiles::new(&fs)
            .extract_common("root/a/values.yaml", "root/x/a/values.yaml")
            .unwrap_err();

        assert!(matches!(err, FilesError::NotSiblings { .. }));
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let fs = setup_pair();
        fs.write_file("apps/b/values.yaml", "image: [unclosed\n");

        let err = ValuesFiles::new(&fs)
            .extract_common("apps/a/values.yaml", "apps/b/values.yaml")
            .unwrap_err();

        match err {
            FilesError::Parse { path, .. } => assert_eq!(path, PathBuf::from("apps/b/values.yaml")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!fs.is_file(Path::new("apps/values.yaml")));
    }

    #[test]
    fn test_read_only_parent_changes_nothing() {
        let fs = setup_pair();
        fs.set_read_only("apps", true);

        let err = ValuesFiles::new(&fs)
            .extract_common("apps/a/values.yaml", "apps/b/values.yaml")
            .unwrap_err();

        assert!(matches!(err, FilesError::Io { .. }));
        assert!(!fs.is_file(Path::new("apps/values.yaml")));
        assert_eq!(
            fs.read_file(Path::new("apps/a/values.yaml")).unwrap(),
            b"image: nginx\nport: 80\n"
        );
    }

    #[test]
    fn test_failed_remainder_write_rolls_back_group() {
        let fs = setup_pair();
        fs.set_read_only("apps/b", true);

        let err = ValuesFiles::new(&fs)
            .extract_common("apps/a/values.yaml", "apps/b/values.yaml")
            .unwrap_err();

        assert!(matches!(err, FilesError::Io { ref path, .. } if path == Path::new("apps/b/values.yaml")));
        assert!(!fs.is_file(Path::new("apps/values.yaml")));
        assert_eq!(
            fs.read_file(Path::new("apps/a/values.yaml")).unwrap(),
            b"image: nginx\nport: 80\n"
        );
        assert_eq!(
            fs.read_file(Path::new("apps/b/values.yaml")).unwrap(),
            b"image: nginx\nport: 81\n"
        );
    }

    #[test]
    fn test_existing_parent_document_is_merged() {
        let fs = setup_pair();
        fs.write_file("apps/values.yaml", "team: core\nimage: busybox\n");

        ValuesFiles::new(&fs)
            .extract_common("apps/a/values.yaml", "apps/b/values.yaml")
            .unwrap();

        assert_eq!(
            read(&fs, "apps/values.yaml"),
            yaml("team: core\nimage: nginx\n")
        );
    }

    #[test]
    fn test_n_files_with_equal_lists_option() {
        let fs = InMemoryFilesystem::new();
        for name in ["a", "b", "c"] {
            fs.write_file(format!("g/{name}/values.yaml"), format!("hosts: [x, y]\nname: {name}\nzone: eu\n"));
        }
        let paths = ["g/a/values.yaml", "g/b/values.yaml", "g/c/values.yaml"];

        ValuesFiles::new(&fs)
            .with_options(ExtractOptions::default().with_include_equal_lists_in_common(false))
            .extract_common_n(&paths)
            .unwrap();

        assert_eq!(read(&fs, "g/values.yaml"), yaml("zone: eu\n"));
        assert_eq!(read(&fs, "g/b/values.yaml"), yaml("hosts: [x, y]\nname: b\n"));
    }
}
