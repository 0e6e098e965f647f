//! Build orchestration.
//!
//! [`build_project`] builds every target of a project in declared order:
//!
//! 1. validate the project and resolve every target's sources up front, so a
//!    configuration error aborts before any step runs
//! 2. create the bin and obj directories
//! 3. per target: plan, then synthesize and execute if the target is stale
//!
//! The first failing step aborts the pass. Nothing after it is attempted.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::command::{BuildCommand, Dialect, check_supported, synthesize};
use crate::config::{ConfigError, ProjectConfig, TargetConfig};
use crate::discover::{DiscoverError, FileTree, resolve_target_sources};
use crate::execute::{ExecuteError, Executor};
use crate::incremental::{Freshness, IncrementalPlanner, StaleReason, StalenessError, include_inputs};

/// Errors that abort a build pass.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Discover(#[from] DiscoverError),

  #[error(transparent)]
  Staleness(#[from] StalenessError),

  #[error("could not run the build step for {target}: {source}")]
  Execute {
    target: String,
    #[source]
    source: ExecuteError,
  },

  #[error("failed to prepare {path}: {source}")]
  FileSystem {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("target {target} failed with exit code {exit_code}")]
  ToolchainFailure {
    target: String,
    exit_code: i32,
    stdout: String,
    stderr: String,
  },
}

impl BuildError {
  /// Process exit code for this failure.
  ///
  /// A toolchain failure returns the failing step's own code; everything
  /// else is `1`.
  pub fn exit_code(&self) -> i32 {
    match self {
      BuildError::ToolchainFailure { exit_code, .. } if *exit_code != 0 => *exit_code,
      _ => 1,
    }
  }

  /// Captured output of the failing step, if there was one.
  pub fn diagnostics(&self) -> Option<String> {
    let BuildError::ToolchainFailure {
      target,
      exit_code,
      stdout,
      stderr,
    } = self
    else {
      return None;
    };

    let mut text = format!("target: {}\nexit code: {}\n", target, exit_code);
    if !stdout.trim().is_empty() {
      text.push_str("--- stdout ---\n");
      text.push_str(stdout.trim_end());
      text.push('\n');
    }
    if !stderr.trim().is_empty() {
      text.push_str("--- stderr ---\n");
      text.push_str(stderr.trim_end());
      text.push('\n');
    }
    Some(text)
  }
}

/// Knobs for one build pass.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
  /// Skip targets whose artifact is up to date.
  pub incremental: bool,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self { incremental: true }
  }
}

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TargetOutcome {
  Built { reason: StaleReason },
  Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
  pub name: String,
  pub artifact: PathBuf,
  #[serde(flatten)]
  pub outcome: TargetOutcome,
}

/// Summary of a successful pass.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
  pub project: String,
  pub targets: Vec<TargetReport>,
  pub elapsed: Duration,
}

impl BuildReport {
  pub fn built(&self) -> usize {
    self.targets.iter().filter(|t| matches!(t.outcome, TargetOutcome::Built { .. })).count()
  }

  pub fn skipped(&self) -> usize {
    self.targets.iter().filter(|t| t.outcome == TargetOutcome::Skipped).count()
  }
}

/// A synthesized but not executed step.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedCommand {
  pub target: String,
  pub artifact: PathBuf,
  pub command: BuildCommand,
}

/// Validate `project` against `dialect` and resolve every target's sources.
///
/// Returns one source list per target, in declared order. Fails on the first
/// configuration error; nothing is created or executed.
pub fn resolve_sources<D, T>(project: &ProjectConfig, dialect: &D, tree: &T) -> Result<Vec<Vec<PathBuf>>, BuildError>
where
  D: Dialect + ?Sized,
  T: FileTree + ?Sized,
{
  project.validate()?;

  let mut resolved = Vec::with_capacity(project.targets.len());
  for target in &project.targets {
    check_supported(dialect, target)?;

    let sources = resolve_target_sources(tree, project, target)?;
    if sources.is_empty() {
      return Err(ConfigError::EmptySources(target.name.clone()).into());
    }
    debug!(target = %target.name, count = sources.len(), "resolved sources");
    resolved.push(sources);
  }

  Ok(resolved)
}

/// Synthesize every target's command without executing anything.
pub fn preview<D, T>(project: &ProjectConfig, dialect: &D, tree: &T) -> Result<Vec<PlannedCommand>, BuildError>
where
  D: Dialect + ?Sized,
  T: FileTree + ?Sized,
{
  let resolved = resolve_sources(project, dialect, tree)?;

  Ok(
    project
      .targets
      .iter()
      .zip(resolved)
      .map(|(target, sources)| PlannedCommand {
        target: target.name.clone(),
        artifact: dialect.artifact_path(project, target),
        command: synthesize(dialect, project, target, &sources),
      })
      .collect(),
  )
}

/// Create the project's bin and obj directories.
///
/// Directories that already exist are left alone, so calling this any number
/// of times succeeds.
pub fn ensure_output_dirs(project: &ProjectConfig) -> Result<(), BuildError> {
  for dir in [project.bin_path(), project.obj_path()] {
    std::fs::create_dir_all(&dir).map_err(|source| BuildError::FileSystem { path: dir.clone(), source })?;
    debug!(dir = %dir.display(), "output directory ready");
  }
  Ok(())
}

/// Remove the project's bin and obj directories.
///
/// Returns the directories that were actually removed.
pub fn clean(project: &ProjectConfig) -> Result<Vec<PathBuf>, BuildError> {
  let mut removed = Vec::new();

  for dir in [project.obj_path(), project.bin_path()] {
    match std::fs::remove_dir_all(&dir) {
      Ok(()) => {
        info!(dir = %dir.display(), "removed");
        removed.push(dir);
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(source) => return Err(BuildError::FileSystem { path: dir, source }),
    }
  }

  Ok(removed)
}

/// Everything whose modification can make `target`'s artifact stale.
///
/// Sources, files under its include directories, and the artifacts of the
/// targets it depends on.
fn planner_inputs<D: Dialect + ?Sized>(
  project: &ProjectConfig,
  dialect: &D,
  target: &TargetConfig,
  sources: &[PathBuf],
) -> Result<Vec<PathBuf>, BuildError> {
  let mut inputs = sources.to_vec();
  inputs.extend(include_inputs(project, target)?);
  for dep in &target.deps {
    if let Some(dep) = project.find_target(dep) {
      inputs.push(dialect.artifact_path(project, dep));
    }
  }
  Ok(inputs)
}

/// Build every target of `project` in declared order.
///
/// Returns a report on success, including a pass where every target was
/// skipped. Returns the first error otherwise; later targets are never
/// attempted.
pub async fn build_project<D, E, T>(
  project: &ProjectConfig,
  dialect: &D,
  executor: &E,
  tree: &T,
  options: BuildOptions,
) -> Result<BuildReport, BuildError>
where
  D: Dialect + ?Sized,
  E: Executor,
  T: FileTree + ?Sized,
{
  let start = Instant::now();
  let resolved = resolve_sources(project, dialect, tree)?;
  ensure_output_dirs(project)?;

  info!(
    project = %project.name,
    targets = project.targets.len(),
    dialect = dialect.name(),
    "building project"
  );

  let mut planner = IncrementalPlanner::new(options.incremental);
  let mut targets = Vec::with_capacity(project.targets.len());

  for (target, sources) in project.targets.iter().zip(resolved) {
    let artifact = dialect.artifact_path(project, target);
    let inputs = planner_inputs(project, dialect, target, &sources)?;

    let reason = match planner.plan(target, &artifact, &inputs)? {
      Freshness::Fresh => {
        info!(target = %target.name, "up to date, skipping");
        targets.push(TargetReport {
          name: target.name.clone(),
          artifact,
          outcome: TargetOutcome::Skipped,
        });
        continue;
      }
      Freshness::Stale(reason) => reason,
    };

    info!(target = %target.name, %reason, "building target");
    let command = synthesize(dialect, project, target, &sources);
    let result = executor
      .execute(&command)
      .await
      .map_err(|source| BuildError::Execute {
        target: target.name.clone(),
        source,
      })?;

    if !result.success() {
      error!(target = %target.name, exit_code = result.exit_code, "build step failed");
      return Err(BuildError::ToolchainFailure {
        target: target.name.clone(),
        exit_code: result.exit_code,
        stdout: result.stdout,
        stderr: result.stderr,
      });
    }

    planner.record_rebuilt(&target.name);
    targets.push(TargetReport {
      name: target.name.clone(),
      artifact,
      outcome: TargetOutcome::Built { reason },
    });
  }

  let report = BuildReport {
    project: project.name.clone(),
    targets,
    elapsed: start.elapsed(),
  };
  info!(built = report.built(), skipped = report.skipped(), "build finished");
  Ok(report)
}

#[cfg(test)]
mod tests {
  use std::path::Path;
  use std::sync::Mutex;
  use std::time::SystemTime;

  use tempfile::TempDir;
  use tracing_test::traced_test;

  use super::*;
  use crate::command::Gnu;
  use crate::config::{ArtifactKind, TargetBuilder};
  use crate::discover::StdFileTree;
  use crate::execute::ProcessResult;
  use crate::util::testutil::{set_mtime, write_empty};

  /// Records every command and succeeds unless the call index is listed in
  /// `fail_at`. Successful calls create the `-o` artifact.
  #[derive(Default)]
  struct MockExecutor {
    calls: Mutex<Vec<BuildCommand>>,
    fail_at: Option<usize>,
  }

  impl MockExecutor {
    fn failing_at(index: usize) -> Self {
      Self {
        fail_at: Some(index),
        ..Self::default()
      }
    }

    fn count(&self) -> usize {
      self.calls.lock().unwrap().len()
    }

    fn artifacts_written(&self) -> Vec<String> {
      self
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|c| {
          let at = c.args.iter().position(|a| a == "-o").unwrap();
          c.args[at + 1].clone()
        })
        .collect()
    }
  }

  impl Executor for MockExecutor {
    async fn execute(&self, command: &BuildCommand) -> Result<ProcessResult, ExecuteError> {
      let index = {
        let mut calls = self.calls.lock().unwrap();
        calls.push(command.clone());
        calls.len() - 1
      };

      if self.fail_at == Some(index) {
        return Ok(ProcessResult {
          exit_code: 2,
          stdout: "main.cpp(3): error C2065".to_string(),
          stderr: "fatal".to_string(),
        });
      }

      if let Some(at) = command.args.iter().position(|a| a == "-o") {
        write_empty(Path::new(&command.args[at + 1]));
      }
      Ok(ProcessResult {
        exit_code: 0,
        stdout: String::new(),
        stderr: String::new(),
      })
    }
  }

  struct Workspace {
    temp: TempDir,
  }

  impl Workspace {
    fn new(files: &[&str]) -> Self {
      let temp = TempDir::new().unwrap();
      for file in files {
        write_empty(&temp.path().join(file));
      }
      Self { temp }
    }

    fn project(&self, targets: Vec<TargetBuilder>) -> ProjectConfig {
      let mut builder = ProjectConfig::builder("demo", self.temp.path());
      for target in targets {
        builder = builder.target(target);
      }
      builder.build().unwrap()
    }
  }

  fn exe(name: &str) -> TargetBuilder {
    TargetConfig::builder(name, ArtifactKind::Executable).discover(format!("{}/src", name), ".cpp")
  }

  fn three_targets() -> (Workspace, ProjectConfig) {
    let ws = Workspace::new(&["a/src/main.cpp", "b/src/main.cpp", "c/src/main.cpp"]);
    let project = ws.project(vec![exe("a"), exe("b"), exe("c")]);
    (ws, project)
  }

  async fn run(project: &ProjectConfig, executor: &MockExecutor, options: BuildOptions) -> Result<BuildReport, BuildError> {
    build_project(project, &Gnu::new("mock-cc"), executor, &StdFileTree, options).await
  }

  #[tokio::test]
  async fn builds_every_target_in_declared_order() {
    let (_ws, project) = three_targets();
    let executor = MockExecutor::default();

    let report = run(&project, &executor, BuildOptions::default()).await.unwrap();

    assert_eq!(report.built(), 3);
    let gnu = Gnu::new("mock-cc");
    let expected: Vec<String> = project
      .targets
      .iter()
      .map(|t| gnu.artifact_path(&project, t).display().to_string())
      .collect();
    assert_eq!(executor.artifacts_written(), expected);
  }

  #[tokio::test]
  async fn failure_stops_the_pass() {
    for failing in 0..3 {
      let (_ws, project) = three_targets();
      let executor = MockExecutor::failing_at(failing);

      let err = run(&project, &executor, BuildOptions::default()).await.unwrap_err();

      assert_eq!(executor.count(), failing + 1, "failing target {}", failing);
      match &err {
        BuildError::ToolchainFailure { target, exit_code, .. } => {
          assert_eq!(target, &project.targets[failing].name);
          assert_eq!(*exit_code, 2);
        }
        other => panic!("unexpected error: {other}"),
      }
      assert_eq!(err.exit_code(), 2);
    }
  }

  #[tokio::test]
  async fn diagnostics_include_captured_output() {
    let (_ws, project) = three_targets();
    let err = run(&project, &MockExecutor::failing_at(0), BuildOptions::default())
      .await
      .unwrap_err();

    let text = err.diagnostics().unwrap();
    assert!(text.contains("target: a"));
    assert!(text.contains("exit code: 2"));
    assert!(text.contains("error C2065"));
    assert!(text.contains("fatal"));
  }

  #[tokio::test]
  async fn configuration_errors_run_nothing() {
    let ws = Workspace::new(&["a/src/main.cpp", "empty/src/README.txt"]);
    let project = ws.project(vec![exe("a"), exe("empty")]);
    let executor = MockExecutor::default();

    let err = run(&project, &executor, BuildOptions::default()).await.unwrap_err();

    assert!(matches!(err, BuildError::Config(ConfigError::EmptySources(ref name)) if name == "empty"));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(executor.count(), 0);
    assert!(!project.bin_path().exists());
  }

  #[tokio::test]
  async fn unsupported_kind_is_rejected_before_any_step() {
    let ws = Workspace::new(&["a/src/main.cpp", "lib/src/lib.cpp"]);
    let project = ws.project(vec![
      exe("a"),
      TargetConfig::builder("lib", ArtifactKind::StaticLibrary).discover("lib/src", ".cpp"),
    ]);
    let executor = MockExecutor::default();

    let err = run(&project, &executor, BuildOptions::default()).await.unwrap_err();

    assert!(matches!(err, BuildError::Config(ConfigError::UnsupportedArtifactKind { .. })));
    assert_eq!(executor.count(), 0);
  }

  #[tokio::test]
  async fn validate_is_rerun_before_building() {
    let (_ws, mut project) = three_targets();
    project.targets.push(project.targets[0].clone());
    let executor = MockExecutor::default();

    let err = run(&project, &executor, BuildOptions::default()).await.unwrap_err();

    assert!(matches!(err, BuildError::Config(ConfigError::DuplicateTarget(_))));
    assert_eq!(executor.count(), 0);
  }

  #[test]
  fn ensure_output_dirs_is_idempotent() {
    let ws = Workspace::new(&[]);
    let project = ws.project(vec![]);

    ensure_output_dirs(&project).unwrap();
    ensure_output_dirs(&project).unwrap();

    assert!(project.bin_path().is_dir());
    assert!(project.obj_path().is_dir());
  }

  #[test]
  fn ensure_output_dirs_reports_file_in_the_way() {
    let ws = Workspace::new(&["bin"]);
    let project = ws.project(vec![]);

    let err = ensure_output_dirs(&project).unwrap_err();
    assert!(matches!(err, BuildError::FileSystem { ref path, .. } if *path == project.bin_path()));
  }

  #[tokio::test]
  async fn second_pass_skips_everything() {
    let (_ws, project) = three_targets();
    let executor = MockExecutor::default();
    run(&project, &executor, BuildOptions::default()).await.unwrap();

    // Push sources into the past so the fresh artifacts strictly postdate them.
    let past = SystemTime::now();
    for name in ["a", "b", "c"] {
      set_mtime(&project.root.join(name).join("src").join("main.cpp"), past, -60);
    }

    let again = MockExecutor::default();
    let report = run(&project, &again, BuildOptions::default()).await.unwrap();

    assert_eq!(again.count(), 0);
    assert_eq!(report.skipped(), 3);
    assert_eq!(report.built(), 0);
  }

  #[tokio::test]
  async fn touching_one_input_rebuilds_only_that_target() {
    let (_ws, project) = three_targets();
    run(&project, &MockExecutor::default(), BuildOptions::default()).await.unwrap();

    let now = SystemTime::now();
    for name in ["a", "b", "c"] {
      set_mtime(&project.root.join(name).join("src").join("main.cpp"), now, -60);
    }
    set_mtime(&project.root.join("b").join("src").join("main.cpp"), now, 60);

    let executor = MockExecutor::default();
    let report = run(&project, &executor, BuildOptions::default()).await.unwrap();

    assert_eq!(executor.count(), 1);
    assert_eq!(report.targets[0].outcome, TargetOutcome::Skipped);
    assert!(matches!(
      report.targets[1].outcome,
      TargetOutcome::Built {
        reason: StaleReason::NewerInput(_)
      }
    ));
    assert_eq!(report.targets[2].outcome, TargetOutcome::Skipped);
  }

  #[tokio::test]
  async fn rebuilt_dependency_forces_dependent_rebuild() {
    let ws = Workspace::new(&["lib/src/lib.cpp", "app/src/main.cpp"]);
    let project = ws.project(vec![
      TargetConfig::builder("lib", ArtifactKind::SharedLibrary).discover("lib/src", ".cpp"),
      exe("app").dep("lib"),
    ]);
    run(&project, &MockExecutor::default(), BuildOptions::default()).await.unwrap();

    let now = SystemTime::now();
    let gnu = Gnu::new("mock-cc");
    set_mtime(&project.root.join("app/src/main.cpp"), now, -60);
    set_mtime(&gnu.artifact_path(&project, &project.targets[0]), now, -30);
    set_mtime(&gnu.artifact_path(&project, &project.targets[1]), now, -30);
    set_mtime(&project.root.join("lib/src/lib.cpp"), now, 0);

    let executor = MockExecutor::default();
    let report = run(&project, &executor, BuildOptions::default()).await.unwrap();

    assert_eq!(executor.count(), 2);
    assert_eq!(
      report.targets[1].outcome,
      TargetOutcome::Built {
        reason: StaleReason::UpstreamRebuilt("lib".to_string())
      }
    );
  }

  #[tokio::test]
  async fn full_build_ignores_fresh_artifacts() {
    let (_ws, project) = three_targets();
    run(&project, &MockExecutor::default(), BuildOptions::default()).await.unwrap();

    let executor = MockExecutor::default();
    let report = run(&project, &executor, BuildOptions { incremental: false }).await.unwrap();

    assert_eq!(executor.count(), 3);
    assert_eq!(report.built(), 3);
  }

  #[tokio::test]
  #[traced_test]
  async fn skipped_targets_are_logged() {
    let (_ws, project) = three_targets();
    run(&project, &MockExecutor::default(), BuildOptions::default()).await.unwrap();
    for name in ["a", "b", "c"] {
      set_mtime(&project.root.join(name).join("src").join("main.cpp"), SystemTime::now(), -60);
    }

    run(&project, &MockExecutor::default(), BuildOptions::default()).await.unwrap();

    assert!(logs_contain("up to date, skipping"));
  }

  #[test]
  fn preview_synthesizes_without_executing() {
    let (_ws, project) = three_targets();

    let planned = preview(&project, &Gnu::new("mock-cc"), &StdFileTree).unwrap();

    assert_eq!(planned.len(), 3);
    assert_eq!(planned[0].target, "a");
    assert_eq!(planned[0].command.program, "mock-cc");
    assert!(!project.bin_path().exists());
  }

  #[test]
  fn clean_removes_output_dirs_and_tolerates_absence() {
    let ws = Workspace::new(&[]);
    let project = ws.project(vec![]);
    ensure_output_dirs(&project).unwrap();

    let removed = clean(&project).unwrap();
    assert!(!project.bin_path().exists());
    assert!(!removed.is_empty());

    assert!(clean(&project).unwrap().is_empty());
  }
}
