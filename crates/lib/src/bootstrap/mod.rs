//! Self-rebuild before doing any work.
//!
//! The tool compares its own artifact with its own sources on every start.
//! The two states are [`SelfState::Fresh`] and [`SelfState::Stale`]:
//!
//! ```text
//! Stale --self-build--> relaunch (marker set) --> Fresh --> proceed
//!   |                                               ^
//!   +-- marker already set --------warn-------------+
//! ```
//!
//! The relaunched process carries [`SELF_REBUILT_ENV`](crate::consts::SELF_REBUILT_ENV)
//! in its environment and never rebuilds again, so a rebuild can happen at
//! most once per invocation chain. A failed self-build stops the tool before
//! any build logic runs.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::command::BuildCommand;
use crate::consts::{SELF_REBUILT_ENV, STALE_ARTIFACT_SUFFIX};
use crate::execute::{ExecuteError, Executor};
use crate::incremental::{Freshness, StaleReason, StalenessError, check_staleness};

#[derive(Debug, Error)]
pub enum BootstrapError {
  #[error(transparent)]
  Staleness(#[from] StalenessError),

  #[error("could not start the self-build: {0}")]
  Spawn(#[source] ExecuteError),

  #[error("self-build failed with exit code {exit_code}")]
  SelfBuildFailed {
    exit_code: i32,
    stdout: String,
    stderr: String,
  },

  #[error("self-build reported success but {0}")]
  StillStale(StaleReason),

  #[error("failed to refresh the timestamp of {path}: {source}")]
  Refresh {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to move the running artifact {path} aside: {source}")]
  SetAside {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to relaunch {artifact}: {source}")]
  Relaunch {
    artifact: PathBuf,
    #[source]
    source: io::Error,
  },
}

impl BootstrapError {
  pub fn exit_code(&self) -> i32 {
    match self {
      BootstrapError::SelfBuildFailed { exit_code, .. } if *exit_code != 0 => *exit_code,
      _ => 1,
    }
  }

  /// Captured output of a failed self-build.
  pub fn diagnostics(&self) -> Option<String> {
    let BootstrapError::SelfBuildFailed {
      exit_code,
      stdout,
      stderr,
    } = self
    else {
      return None;
    };

    let mut text = format!("self-build exit code: {}\n", exit_code);
    for (label, stream) in [("stdout", stdout), ("stderr", stderr)] {
      if !stream.trim().is_empty() {
        text.push_str(&format!("--- {} ---\n{}\n", label, stream.trim_end()));
      }
    }
    Some(text)
  }
}

/// Whether the running artifact matches its sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfState {
  Fresh,
  Stale(StaleReason),
}

/// How the tool rebuilds itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfBuild {
  /// The tool's own compiled artifact.
  pub artifact: PathBuf,
  /// Every file whose modification should trigger a self-build.
  pub sources: Vec<PathBuf>,
  /// Invocation that refreshes `artifact`.
  pub command: BuildCommand,
}

impl SelfBuild {
  pub fn new(artifact: impl Into<PathBuf>, sources: Vec<PathBuf>, command: BuildCommand) -> Self {
    Self {
      artifact: artifact.into(),
      sources,
      command,
    }
  }

  pub fn state(&self) -> Result<SelfState, BootstrapError> {
    Ok(match check_staleness(&self.artifact, &self.sources)? {
      Freshness::Fresh => SelfState::Fresh,
      Freshness::Stale(reason) => SelfState::Stale(reason),
    })
  }
}

/// Replaces or re-runs the current process with a refreshed artifact.
pub trait Relauncher {
  /// Run `artifact` with `args` and the rebuilt marker set.
  ///
  /// Returns the relaunched process's exit code. Implementations that replace
  /// the current process image only return on failure.
  fn relaunch(&self, artifact: &Path, args: &[OsString]) -> io::Result<i32>;
}

/// [`Relauncher`] for real processes.
///
/// On Unix the current process image is replaced, so the relaunched tool
/// keeps the same pid and its exit code reaches the caller. On
/// other platforms the artifact runs as a child and its exit code is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRelauncher;

impl Relauncher for ProcessRelauncher {
  fn relaunch(&self, artifact: &Path, args: &[OsString]) -> io::Result<i32> {
    let mut command = std::process::Command::new(artifact);
    command.args(args).env(SELF_REBUILT_ENV, "1");
    info!(artifact = %artifact.display(), "relaunching");
    run_relaunched(command)
  }
}

#[cfg(unix)]
fn run_relaunched(mut command: std::process::Command) -> io::Result<i32> {
  use std::os::unix::process::CommandExt;
  Err(command.exec())
}

#[cfg(not(unix))]
fn run_relaunched(mut command: std::process::Command) -> io::Result<i32> {
  let status = command.status()?;
  Ok(status.code().unwrap_or(crate::execute::NO_EXIT_CODE))
}

/// What the caller should do after [`Bootstrapper::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
  /// The running binary is current; go on with the build.
  Proceed,
  /// A refreshed binary already ran; exit with its code.
  Relaunched { exit_code: i32 },
}

/// Drives the self-rebuild state machine once per process.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
  self_build: SelfBuild,
  args: Vec<OsString>,
  relaunched: bool,
  set_aside_running: bool,
}

impl Bootstrapper {
  /// `args` are forwarded to the relaunched process unchanged and exclude
  /// the program name.
  pub fn new(self_build: SelfBuild, args: Vec<OsString>) -> Self {
    Self {
      self_build,
      args,
      relaunched: false,
      set_aside_running: cfg!(windows),
    }
  }

  /// Bootstrapper for the current process: arguments from the command line,
  /// relaunch marker from the environment.
  pub fn from_env(self_build: SelfBuild) -> Self {
    let args = std::env::args_os().skip(1).collect();
    Self::new(self_build, args).relaunched(is_relaunched())
  }

  /// Mark this process as already relaunched after a self-build.
  pub fn relaunched(mut self, relaunched: bool) -> Self {
    self.relaunched = relaunched;
    self
  }

  /// Rename the running artifact out of the way before building.
  ///
  /// Needed where a running executable cannot be overwritten. On by default
  /// on Windows.
  pub fn set_aside_running(mut self, enabled: bool) -> Self {
    self.set_aside_running = enabled;
    self
  }

  pub async fn run<E, R>(&self, executor: &E, relauncher: &R) -> Result<BootstrapOutcome, BootstrapError>
  where
    E: Executor,
    R: Relauncher,
  {
    let reason = match self.self_build.state()? {
      SelfState::Fresh => {
        debug!(artifact = %self.self_build.artifact.display(), "self is fresh");
        return Ok(BootstrapOutcome::Proceed);
      }
      SelfState::Stale(reason) => reason,
    };

    if self.relaunched {
      warn!(%reason, "artifact still looks stale after a self-rebuild, not rebuilding again");
      return Ok(BootstrapOutcome::Proceed);
    }

    info!(%reason, "self is stale, rebuilding");
    let set_aside = if self.set_aside_running {
      set_aside(&self.self_build.artifact)?
    } else {
      None
    };

    let result = match executor.execute(&self.self_build.command).await {
      Ok(result) => result,
      Err(e) => {
        restore(set_aside.as_deref(), &self.self_build.artifact);
        return Err(BootstrapError::Spawn(e));
      }
    };

    if !result.success() {
      restore(set_aside.as_deref(), &self.self_build.artifact);
      return Err(BootstrapError::SelfBuildFailed {
        exit_code: result.exit_code,
        stdout: result.stdout,
        stderr: result.stderr,
      });
    }

    if let Err(e) = self.ensure_refreshed() {
      restore(set_aside.as_deref(), &self.self_build.artifact);
      return Err(e);
    }

    let exit_code = relauncher
      .relaunch(&self.self_build.artifact, &self.args)
      .map_err(|source| BootstrapError::Relaunch {
        artifact: self.self_build.artifact.clone(),
        source,
      })?;

    Ok(BootstrapOutcome::Relaunched { exit_code })
  }

  /// The relaunched process must observe [`SelfState::Fresh`].
  ///
  /// A build tool that finds nothing to recompile (e.g. only a manifest was
  /// touched) reports success without relinking; the artifact's timestamp is
  /// then moved to now.
  fn ensure_refreshed(&self) -> Result<(), BootstrapError> {
    let artifact = &self.self_build.artifact;
    match self.self_build.state()? {
      SelfState::Fresh => return Ok(()),
      SelfState::Stale(StaleReason::NewerInput(input)) => {
        debug!(
          artifact = %artifact.display(),
          input = %input.display(),
          "self-build left the artifact untouched, refreshing its timestamp"
        );
        touch(artifact).map_err(|source| BootstrapError::Refresh {
          path: artifact.clone(),
          source,
        })?;
      }
      SelfState::Stale(reason) => return Err(BootstrapError::StillStale(reason)),
    }

    match self.self_build.state()? {
      SelfState::Fresh => Ok(()),
      SelfState::Stale(reason) => Err(BootstrapError::StillStale(reason)),
    }
  }
}

/// Set the modification time of `path` to now.
fn touch(path: &Path) -> io::Result<()> {
  // A running image cannot be opened for writing on Unix; owning it is enough
  // to change its timestamps.
  #[cfg(unix)]
  let file = std::fs::File::open(path)?;
  #[cfg(not(unix))]
  let file = std::fs::File::options().write(true).open(path)?;
  file.set_modified(SystemTime::now())
}

/// Whether the rebuilt marker is present in this process's environment.
pub fn is_relaunched() -> bool {
  std::env::var_os(SELF_REBUILT_ENV).is_some_and(|v| !v.is_empty())
}

fn stale_path(artifact: &Path) -> PathBuf {
  let mut path = artifact.as_os_str().to_owned();
  path.push(".");
  path.push(STALE_ARTIFACT_SUFFIX);
  PathBuf::from(path)
}

fn set_aside(artifact: &Path) -> Result<Option<PathBuf>, BootstrapError> {
  if !artifact.exists() {
    return Ok(None);
  }

  let aside = stale_path(artifact);
  // Left over from an earlier rebuild; failing to remove it surfaces in the rename.
  let _ = std::fs::remove_file(&aside);
  std::fs::rename(artifact, &aside).map_err(|source| BootstrapError::SetAside {
    path: artifact.to_path_buf(),
    source,
  })?;
  debug!(from = %artifact.display(), to = %aside.display(), "moved running artifact aside");
  Ok(Some(aside))
}

fn restore(aside: Option<&Path>, artifact: &Path) {
  let Some(aside) = aside else { return };
  if artifact.exists() {
    return;
  }
  if let Err(e) = std::fs::rename(aside, artifact) {
    warn!(artifact = %artifact.display(), error = %e, "could not restore the previous artifact");
  }
}
