//! Recursive source-file discovery.
//!
//! The walk is a depth-first traversal over an explicit worklist of
//! directories. It touches the file system only through the [`FileTree`]
//! trait, which exposes two calls: list a directory and ask whether an entry
//! is a directory.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{ProjectConfig, SourceRule, TargetConfig};

/// Failure while walking a source tree.
#[derive(Debug, Error)]
pub enum DiscoverError {
  #[error("failed to list directory {path}: {source}")]
  ListDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// File-system access needed by the walk.
pub trait FileTree {
  /// Entries of `dir` as full paths. May include `.` and `..`; the walk skips them.
  fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

  /// Whether `path` is a directory to descend into.
  fn is_dir(&self, path: &Path) -> bool;
}

/// [`FileTree`] backed by `std::fs`.
///
/// Symbolic links to directories are not followed, so cyclic links cannot
/// make the walk loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileTree;

impl FileTree for StdFileTree {
  fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
    std::fs::read_dir(dir)?
      .map(|entry| entry.map(|e| e.path()))
      .collect()
  }

  fn is_dir(&self, path: &Path) -> bool {
    std::fs::symlink_metadata(path)
      .map(|m| m.file_type().is_dir())
      .unwrap_or(false)
  }
}

/// Every file beneath `root` whose name ends with one of `suffixes`.
///
/// Matching is a literal suffix comparison on the file name; `.cpp` matches
/// `a.cpp` and `xcpp.cpp` but a bare `cpp` would also match `notcpp`.
/// Entries within a directory are visited in file-name order and files of a
/// directory precede those of its subdirectories, so the result is stable for
/// an unchanged tree. No matches is an empty result, not an error.
pub fn discover_sources<T: FileTree + ?Sized>(
  tree: &T,
  root: &Path,
  suffixes: &[String],
) -> Result<Vec<PathBuf>, DiscoverError> {
  debug!(root = %root.display(), ?suffixes, "discovering sources");

  let mut found = Vec::new();
  let mut worklist = vec![root.to_path_buf()];

  while let Some(dir) = worklist.pop() {
    let mut entries = tree.list(&dir).map_err(|source| DiscoverError::ListDir {
      path: dir.clone(),
      source,
    })?;
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut subdirs = Vec::new();
    for entry in entries {
      let name = entry_name(&entry);
      if name.is_empty() || name == "." || name == ".." {
        continue;
      }

      if tree.is_dir(&entry) {
        subdirs.push(entry);
      } else if suffixes.iter().any(|s| name.ends_with(s.as_str())) {
        trace!(file = %entry.display(), "matched source");
        found.push(entry);
      }
    }

    // Reversed so the lowest-named subdirectory is walked next.
    worklist.extend(subdirs.into_iter().rev());
  }

  debug!(root = %root.display(), count = found.len(), "discovery complete");
  Ok(found)
}

/// Last component of `entry` exactly as listed.
///
/// `Path::file_name` normalizes a trailing `.` away, which would turn the
/// pseudo-entry `dir/.` into `dir` itself.
fn entry_name(entry: &Path) -> String {
  let raw = entry.as_os_str().to_string_lossy();
  raw.rsplit(std::path::is_separator).next().unwrap_or_default().to_string()
}

/// Resolve every source rule of `target` into concrete paths, in rule order.
pub fn resolve_target_sources<T: FileTree + ?Sized>(
  tree: &T,
  project: &ProjectConfig,
  target: &TargetConfig,
) -> Result<Vec<PathBuf>, DiscoverError> {
  let mut sources = Vec::new();

  for rule in &target.sources {
    match rule {
      SourceRule::File { path } => sources.push(project.resolve(path)),
      SourceRule::Discover { root, suffixes } => {
        sources.extend(discover_sources(tree, &project.resolve(root), suffixes)?);
      }
    }
  }

  Ok(sources)
}
