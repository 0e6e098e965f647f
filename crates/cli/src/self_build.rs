//! How the `forge` binary rebuilds itself.
//!
//! The sources are every `.rs` file of this crate and of `forge-lib` plus the
//! manifests; the refresh is a `cargo build` of this package. A binary that
//! was installed away from its sources has nothing to compare against and
//! never rebuilds.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use forge_lib::bootstrap::{BootstrapError, BootstrapOutcome, Bootstrapper, ProcessRelauncher, SelfBuild};
use forge_lib::command::BuildCommand;
use forge_lib::consts::APP_NAME;
use forge_lib::discover::{StdFileTree, discover_sources};
use forge_lib::execute::ProcessExecutor;

use crate::output::{print_diagnostics, print_error, print_info};

const SOURCE_SUFFIXES: &[&str] = &[".rs"];

/// Every file whose change should trigger a self-build, given the workspace
/// root and this crate's directory.
pub fn self_sources(workspace: &Path, cli_dir: &Path) -> Result<Vec<PathBuf>> {
  let suffixes: Vec<String> = SOURCE_SUFFIXES.iter().map(|s| s.to_string()).collect();
  let lib_dir = workspace.join("crates").join("lib");

  let mut sources = Vec::new();
  for crate_dir in [cli_dir, lib_dir.as_path()] {
    let src = crate_dir.join("src");
    if src.is_dir() {
      sources.extend(
        discover_sources(&StdFileTree, &src, &suffixes)
          .with_context(|| format!("Failed to list sources in {}", src.display()))?,
      );
    }
    let manifest = crate_dir.join("Cargo.toml");
    if manifest.is_file() {
      sources.push(manifest);
    }
  }

  let manifest = workspace.join("Cargo.toml");
  if manifest.is_file() {
    sources.push(manifest);
  }

  Ok(sources)
}

/// `cargo build` invocation that refreshes the running binary.
pub fn self_build_command(workspace: &Path) -> BuildCommand {
  let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());

  let command = BuildCommand::new(cargo).args([
    "build".to_string(),
    "--manifest-path".to_string(),
    workspace.join("Cargo.toml").display().to_string(),
    "-p".to_string(),
    env!("CARGO_PKG_NAME").to_string(),
    "--bin".to_string(),
    APP_NAME.to_string(),
  ]);

  if cfg!(debug_assertions) { command } else { command.arg("--release") }
}

/// Self-build description for the running binary, or `None` when its
/// sources are not available.
pub fn forge_self_build() -> Result<Option<SelfBuild>> {
  let cli_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
  if !cli_dir.join("src").is_dir() {
    debug!(dir = %cli_dir.display(), "sources not found, self-rebuild disabled");
    return Ok(None);
  }

  let workspace = cli_dir.join("..").join("..");
  let workspace = dunce::canonicalize(&workspace).unwrap_or(workspace);

  let artifact = std::env::current_exe().context("Failed to locate the running executable")?;
  let artifact = dunce::canonicalize(&artifact).unwrap_or(artifact);

  let sources = self_sources(&workspace, &cli_dir)?;
  Ok(Some(SelfBuild::new(artifact, sources, self_build_command(&workspace))))
}

/// Run the self-rebuild check.
///
/// Returns `Some(exit_code)` when the process must exit now: either a
/// refreshed binary already ran, or the self-build failed and was reported.
pub fn bootstrap() -> Result<Option<i32>> {
  let Some(self_build) = forge_self_build()? else {
    return Ok(None);
  };

  let runtime = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")?;

  let bootstrapper = Bootstrapper::from_env(self_build);
  match runtime.block_on(bootstrapper.run(&ProcessExecutor, &ProcessRelauncher)) {
    Ok(BootstrapOutcome::Proceed) => Ok(None),
    Ok(BootstrapOutcome::Relaunched { exit_code }) => {
      print_info("forge was rebuilt and relaunched");
      Ok(Some(exit_code))
    }
    Err(e @ BootstrapError::SelfBuildFailed { .. }) => {
      print_error(&e.to_string());
      if let Some(text) = e.diagnostics() {
        print_diagnostics(&text);
      }
      Ok(Some(e.exit_code()))
    }
    Err(e) => Err(e.into()),
  }
}
