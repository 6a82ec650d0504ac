//! Bottom-up propagation of common values through a directory tree.
//!
//! Every directory whose child directories hold two or more `values.yaml`
//! files forms a sibling group. Extracting a group creates
//! `<parent>/values.yaml`, which makes the parent itself a candidate member
//! of the group one level up. Passes repeat until one creates no new parent
//! document.
//!
//! | Step | State touched |
//! |------|---------------|
//! | discover | walk `root`, build parent -> children, note directories holding a document |
//! | pass | visit parents deepest first, extract each group of 2+ documents |
//! | commit | mark the parent as holding a document, record the group |
//! | stop | a pass created no new parent document |
//!
//! Groups with nothing in common are skipped. Any other error aborts the run;
//! groups committed before the error stay committed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::codec::Codec;
use crate::files::{FilesError, ValuesFiles, VALUES_FILE_NAME};
use crate::fs::{EntryKind, Filesystem, OsFilesystem};
use crate::types::ExtractOptions;

/// One committed sibling group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRecord {
    /// Pass in which the group was extracted (1-based).
    pub pass: usize,
    /// Document holding the common values.
    pub common: PathBuf,
    /// Child documents rewritten with their remainders.
    pub children: Vec<PathBuf>,
    /// Fingerprint of the common document as written.
    pub fingerprint: String,
    /// Whether the parent already held a document that the common values
    /// were merged into.
    pub merged_into_existing: bool,
}

/// Summary of a recursive run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    /// Parent documents created or overwritten, sorted and deduplicated.
    pub created: Vec<PathBuf>,
    /// Number of passes, including the final one that changed nothing.
    pub passes: usize,
    /// Committed groups in commit order.
    pub groups: Vec<GroupRecord>,
}

/// Worklist state of a recursive run.
#[derive(Debug, Default)]
struct Propagation {
    children: BTreeMap<PathBuf, Vec<PathBuf>>,
    has_values: BTreeSet<PathBuf>,
    /// Parents ordered deepest first, ties by path.
    parents: Vec<PathBuf>,
}

impl Propagation {
    fn discover<F: Filesystem>(fs: &F, root: &Path) -> Result<Self, FilesError> {
        match fs.stat(root) {
            Ok(EntryKind::Dir) => {}
            Ok(EntryKind::File) => return Err(FilesError::RootNotDirectory(root.to_path_buf())),
            Err(e) => return Err(FilesError::io(root, e)),
        }

        let entries = fs.walk(root).map_err(|e| FilesError::io(root, e))?;
        let mut state = Propagation::default();

        for entry in entries {
            match entry.kind {
                EntryKind::Dir => {
                    if entry.path == root {
                        continue;
                    }
                    if let Some(parent) = entry.path.parent() {
                        state
                            .children
                            .entry(parent.to_path_buf())
                            .or_default()
                            .push(entry.path);
                    }
                }
                EntryKind::File => {
                    if entry.path.file_name().map_or(false, |n| n == VALUES_FILE_NAME) {
                        if let Some(dir) = entry.path.parent() {
                            state.has_values.insert(dir.to_path_buf());
                        }
                    }
                }
            }
        }

        let mut parents: Vec<PathBuf> = state.children.keys().cloned().collect();
        parents.sort_by(|a, b| {
            depth(b)
                .cmp(&depth(a))
                .then_with(|| a.cmp(b))
        });
        state.parents = parents;

        tracing::debug!(
            root = %root.display(),
            parents = state.parents.len(),
            documents = state.has_values.len(),
            "Discovered directory tree"
        );
        Ok(state)
    }

    /// Documents of `parent`'s children that currently exist.
    fn group<F: Filesystem>(&self, fs: &F, parent: &Path) -> Vec<PathBuf> {
        self.children
            .get(parent)
            .into_iter()
            .flatten()
            .filter(|child| self.has_values.contains(*child))
            .map(|child| child.join(VALUES_FILE_NAME))
            .filter(|path| fs.is_file(path))
            .collect()
    }

    /// Record that `dir` now holds a document. Returns true if it is new.
    fn mark(&mut self, dir: &Path) -> bool {
        self.has_values.insert(dir.to_path_buf())
    }
}

fn depth(path: &Path) -> usize {
    path.components().count()
}

impl<F: Filesystem, C: Codec> ValuesFiles<F, C> {
    /// Propagate common values bottom-up through the tree at `root`.
    ///
    /// Returns the sorted list of parent documents created or overwritten.
    pub fn extract_common_recursive(&self, root: impl AsRef<Path>) -> Result<Vec<PathBuf>, FilesError> {
        Ok(self.extract_common_recursive_report(root)?.created)
    }

    /// Same as [`extract_common_recursive`](Self::extract_common_recursive),
    /// returning a full report of the run.
    pub fn extract_common_recursive_report(
        &self,
        root: impl AsRef<Path>,
    ) -> Result<PropagationReport, FilesError> {
        let root = root.as_ref();
        let mut state = Propagation::discover(&self.fs, root)?;
        let mut report = PropagationReport::default();
        let mut created = BTreeSet::new();

        loop {
            report.passes += 1;
            let pass = report.passes;
            let mut new_parents = 0;

            for parent in state.parents.clone() {
                let group = state.group(&self.fs, &parent);
                if group.len() < 2 {
                    continue;
                }

                let inputs: Vec<&Path> = group.iter().map(PathBuf::as_path).collect();
                let commit = match self.extract_group(&inputs) {
                    Ok(commit) => commit,
                    Err(FilesError::NoCommon) => {
                        tracing::debug!(parent = %parent.display(), pass, "Skipping group");
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                if state.mark(&parent) {
                    new_parents += 1;
                }
                created.insert(commit.common_path.clone());
                report.groups.push(GroupRecord {
                    pass,
                    common: commit.common_path,
                    children: group,
                    fingerprint: commit.fingerprint,
                    merged_into_existing: commit.merged_into_existing,
                });
            }

            tracing::info!(pass, new_parents, "Propagation pass complete");
            if new_parents == 0 {
                break;
            }
        }

        report.created = created.into_iter().collect();
        tracing::info!(
            root = %root.display(),
            passes = report.passes,
            groups = report.groups.len(),
            created = report.created.len(),
            "Propagation finished"
        );
        Ok(report)
    }
}

/// Propagate common values through the tree at `root` on disk.
pub fn extract_common_recursive(
    root: impl AsRef<Path>,
    options: ExtractOptions,
) -> Result<Vec<PathBuf>, FilesError> {
    ValuesFiles::new(OsFilesystem::new())
        .with_options(options)
        .extract_common_recursive(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::YamlCodec;
    use crate::fs::InMemoryFilesystem;
    use crate::types::TreeValue;

    fn read(fs: &InMemoryFilesystem, path: &str) -> TreeValue {
        YamlCodec.parse(&fs.read_file(Path::new(path)).unwrap()).unwrap()
    }

    fn yaml(text: &str) -> TreeValue {
        YamlCodec.parse(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_parents_are_ordered_deepest_first() {
        let fs = InMemoryFilesystem::new();
        fs.create_dir_all("r/a/x/1");
        fs.create_dir_all("r/b/y");

        let state = Propagation::discover(&fs, Path::new("r")).unwrap();

        assert_eq!(
            state.parents,
            vec![
                PathBuf::from("r/a/x"),
                PathBuf::from("r/a"),
                PathBuf::from("r/b"),
                PathBuf::from("r"),
            ]
        );
    }

    #[test]
    fn test_single_group() {
        let fs = InMemoryFilesystem::new();
        fs.write_file("r/a/values.yaml", "shared: x\nk1: v1\n");
        fs.write_file("r/b/values.yaml", "shared: x\nk2: v2\n");
        fs.write_file("r/c/values.yaml", "shared: x\nk3: v3\n");

        let report = ValuesFiles::new(&fs)
            .extract_common_recursive_report("r")
            .unwrap();

        assert_eq!(report.created, vec![PathBuf::from("r/values.yaml")]);
        assert_eq!(report.passes, 2);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].children.len(), 3);
        assert_eq!(report.groups[0].fingerprint, yaml("shared: x\n").fingerprint().unwrap());
        assert_eq!(read(&fs, "r/values.yaml"), yaml("shared: x\n"));
        assert_eq!(read(&fs, "r/b/values.yaml"), yaml("k2: v2\n"));
    }

    #[test]
    fn test_lone_document_is_ignored() {
        let fs = InMemoryFilesystem::new();
        fs.write_file("r/a/values.yaml", "k: v\n");
        fs.create_dir_all("r/b");

        let report = ValuesFiles::new(&fs)
            .extract_common_recursive_report("r")
            .unwrap();

        assert!(report.created.is_empty());
        assert_eq!(report.passes, 1);
    }

    #[test]
    fn test_root_must_be_directory() {
        let fs = InMemoryFilesystem::new();
        fs.write_file("r/values.yaml", "k: v\n");
        let files = ValuesFiles::new(&fs);

        assert!(matches!(
            files.extract_common_recursive("r/values.yaml"),
            Err(FilesError::RootNotDirectory(_))
        ));
        assert!(matches!(
            files.extract_common_recursive("missing"),
            Err(FilesError::Io { .. })
        ));
    }

    #[test]
    fn test_report_serializes() {
        let report = PropagationReport {
            created: vec![PathBuf::from("r/values.yaml")],
            passes: 2,
            groups: vec![],
        };

        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["created"][0], "r/values.yaml");
        assert_eq!(json["passes"], 2);
    }
}
