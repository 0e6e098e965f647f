//! Timestamp-based staleness and the per-target incremental planner.
//!
//! [`check_staleness`] is the single primitive shared by the planner and the
//! self-rebuild bootstrapper: an artifact is stale when it is missing or when
//! any input's modification time is strictly later than the artifact's.

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::{ProjectConfig, TargetConfig};

/// Failure reading timestamps.
#[derive(Debug, Error)]
pub enum StalenessError {
  #[error("failed to read modification time of {path}: {source}")]
  Metadata {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to walk include directory {path}: {message}")]
  Walk { path: PathBuf, message: String },
}

/// Why an artifact has to be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StaleReason {
  /// The artifact does not exist.
  MissingArtifact(PathBuf),
  /// An input is newer than the artifact.
  NewerInput(PathBuf),
  /// An input does not exist, so the artifact cannot be trusted.
  MissingInput(PathBuf),
  /// A dependency was rebuilt earlier in this pass.
  UpstreamRebuilt(String),
  /// Incremental planning is turned off.
  Disabled,
}

impl fmt::Display for StaleReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StaleReason::MissingArtifact(path) => write!(f, "artifact {} is missing", path.display()),
      StaleReason::NewerInput(path) => write!(f, "{} is newer than the artifact", path.display()),
      StaleReason::MissingInput(path) => write!(f, "input {} is missing", path.display()),
      StaleReason::UpstreamRebuilt(name) => write!(f, "dependency {} was rebuilt", name),
      StaleReason::Disabled => f.write_str("incremental builds disabled"),
    }
  }
}

/// Result of comparing an artifact with its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
  Fresh,
  Stale(StaleReason),
}

impl Freshness {
  pub fn is_fresh(&self) -> bool {
    matches!(self, Freshness::Fresh)
  }
}

/// Modification time of `path`, or `None` if it does not exist.
pub fn modified(path: &Path) -> Result<Option<SystemTime>, StalenessError> {
  match std::fs::metadata(path).and_then(|m| m.modified()) {
    Ok(time) => Ok(Some(time)),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(source) => Err(StalenessError::Metadata {
      path: path.to_path_buf(),
      source,
    }),
  }
}

/// Compare `artifact` against `inputs`.
///
/// Inputs are checked in order and the first offending one is reported. An
/// input with the same timestamp as the artifact does not make it stale.
pub fn check_staleness(artifact: &Path, inputs: &[PathBuf]) -> Result<Freshness, StalenessError> {
  let Some(artifact_time) = modified(artifact)? else {
    return Ok(Freshness::Stale(StaleReason::MissingArtifact(artifact.to_path_buf())));
  };

  for input in inputs {
    match modified(input)? {
      None => return Ok(Freshness::Stale(StaleReason::MissingInput(input.clone()))),
      Some(time) if time > artifact_time => {
        return Ok(Freshness::Stale(StaleReason::NewerInput(input.clone())));
      }
      Some(_) => {}
    }
  }

  Ok(Freshness::Fresh)
}

/// Every regular file beneath `target`'s include directories, sorted.
///
/// Include directories that do not exist contribute nothing.
pub fn include_inputs(project: &ProjectConfig, target: &TargetConfig) -> Result<Vec<PathBuf>, StalenessError> {
  let mut files = Vec::new();

  for dir in &target.include_dirs {
    let dir = project.resolve(dir);
    if !dir.is_dir() {
      continue;
    }

    for entry in WalkDir::new(&dir).sort_by_file_name() {
      let entry = entry.map_err(|e| StalenessError::Walk {
        path: dir.clone(),
        message: e.to_string(),
      })?;
      if entry.file_type().is_file() {
        files.push(entry.into_path());
      }
    }
  }

  Ok(files)
}

/// Decides per target whether a build step can be skipped.
///
/// A target is skipped only when its artifact exists, no input is newer than
/// it, and none of its dependencies was rebuilt earlier in the same pass.
#[derive(Debug, Clone, Default)]
pub struct IncrementalPlanner {
  enabled: bool,
  rebuilt: HashSet<String>,
}

impl IncrementalPlanner {
  pub fn new(enabled: bool) -> Self {
    Self {
      enabled,
      rebuilt: HashSet::new(),
    }
  }

  pub fn plan(&self, target: &TargetConfig, artifact: &Path, inputs: &[PathBuf]) -> Result<Freshness, StalenessError> {
    if !self.enabled {
      return Ok(Freshness::Stale(StaleReason::Disabled));
    }

    if let Some(dep) = target.deps.iter().find(|d| self.rebuilt.contains(d.as_str())) {
      return Ok(Freshness::Stale(StaleReason::UpstreamRebuilt(dep.clone())));
    }

    let freshness = check_staleness(artifact, inputs)?;
    debug!(target = %target.name, ?freshness, "planned target");
    Ok(freshness)
  }

  /// Note that `name` was rebuilt in this pass.
  pub fn record_rebuilt(&mut self, name: &str) {
    self.rebuilt.insert(name.to_string());
  }
}
