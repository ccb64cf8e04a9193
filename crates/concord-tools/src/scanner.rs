use std::path::{Path, PathBuf};

use tracing::error;

use concord_core::{ConcordError, Result};

/// Extension of every artifact file.
const ARTIFACT_EXTENSION: &str = "toml";

/// Walks a tool directory and yields artifact files.
///
/// The root is checked when the scanner is built, so a missing directory is
/// reported before any artifact is yielded. Each call to [`scan`](Self::scan)
/// walks the tree again.
#[derive(Debug, Clone)]
pub struct ArtifactScanner {
    root: PathBuf,
    include: Option<Vec<String>>,
}

impl ArtifactScanner {
    /// `include` restricts the walk to artifacts with one of these file names.
    pub fn new(root: &Path, include: Option<&[String]>) -> Result<Self> {
        if !root.is_dir() {
            error!(path = ?root, "tool directory does not exist");
            return Err(ConcordError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
            include: include.map(<[String]>::to_vec),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily walk the tree depth-first, entries of each directory in name order.
    pub fn scan(&self) -> Artifacts<'_> {
        Artifacts {
            scanner: self,
            stack: vec![vec![(self.root.clone(), true)].into_iter()],
        }
    }

    fn matches(&self, path: &Path) -> bool {
        if path.extension().is_none_or(|ext| ext != ARTIFACT_EXTENSION) {
            return false;
        }
        match &self.include {
            None => true,
            Some(names) => path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| names.iter().any(|n| n == name)),
        }
    }
}

/// Iterator returned by [`ArtifactScanner::scan`].
pub struct Artifacts<'a> {
    scanner: &'a ArtifactScanner,
    stack: Vec<std::vec::IntoIter<(PathBuf, bool)>>,
}

impl Iterator for Artifacts<'_> {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            let Some((path, is_dir)) = level.next() else {
                self.stack.pop();
                continue;
            };
            if is_dir {
                match sorted_entries(&path) {
                    Ok(entries) => self.stack.push(entries.into_iter()),
                    Err(e) => return Some(Err(e)),
                }
            } else if self.scanner.matches(&path) {
                return Some(Ok(path));
            }
        }
    }
}

/// Entries of one directory with their directory flag. Symlinked directories are not followed.
fn sorted_entries(dir: &Path) -> Result<Vec<(PathBuf, bool)>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let is_dir = entry.file_type()?.is_dir();
        entries.push((entry.path(), is_dir));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}
