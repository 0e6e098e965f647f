//! Toolchain command synthesis.
//!
//! [`synthesize`] turns a project and one of its targets into a single
//! [`BuildCommand`]. The flag order is fixed here; the spelling of each flag
//! comes from a [`Dialect`], so the synthesizer never encodes a particular
//! toolchain's syntax.
//!
//! Order of the emitted arguments:
//! 1. base dialect flags
//! 2. runtime library linkage
//! 3. optimization
//! 4. language standard
//! 5. debug info
//! 6. artifact-kind flags
//! 7. include directories
//! 8. warning level (exactly one table entry)
//! 9. warnings-as-errors
//! 10. ignored warnings (project, then target)
//! 11. defines (project, then target)
//! 12. source files
//! 13. output paths
//! 14. link section: marker, incremental linking, dead-code stripping,
//!     subsystem, link directory, libraries in declared order

pub mod gnu;
pub mod msvc;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ArtifactKind, ConfigError, ProjectConfig, Subsystem, TargetConfig, WarningLevel};

pub use gnu::Gnu;
pub use msvc::Msvc;

/// A fully resolved toolchain invocation.
///
/// Recomputed for every build pass and never mutated after synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildCommand {
  pub program: String,
  pub args: Vec<String>,
}

impl BuildCommand {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }
}

/// Renders the command as a single shell-style line.
///
/// Arguments containing whitespace or quotes are double-quoted.
impl fmt::Display for BuildCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", quote(&self.program))?;
    for arg in &self.args {
      write!(f, " {}", quote(arg))?;
    }
    Ok(())
  }
}

fn quote(arg: &str) -> String {
  if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '"') {
    format!("\"{}\"", arg.replace('"', "\\\""))
  } else {
    arg.to_string()
  }
}

/// The flag vocabulary of one native toolchain.
///
/// Each method spells one concern; the caller decides where it goes in the
/// command line.
pub trait Dialect {
  /// Short name used in diagnostics, e.g. `msvc`.
  fn name(&self) -> &str;

  /// Program that compiles and links in one invocation.
  fn program(&self) -> &str;

  fn supports(&self, kind: ArtifactKind) -> bool;

  fn base_flags(&self) -> Vec<String>;

  fn runtime_linkage(&self, static_runtime: bool, debug_build: bool) -> Vec<String>;

  fn optimization(&self, level: u8, intrinsics: bool) -> Vec<String>;

  fn language_standard(&self, version: u32) -> Vec<String>;

  fn debug_info(&self, enabled: bool) -> Vec<String>;

  fn artifact_kind(&self, kind: ArtifactKind) -> Vec<String>;

  fn include_dir(&self, dir: &Path) -> Vec<String>;

  /// Flag table indexed by [`WarningLevel::index`]; one entry per level.
  fn warning_table(&self) -> &[&'static [&'static str]; 5];

  fn warnings_as_errors(&self) -> Vec<String>;

  fn ignore_warning(&self, code: u32) -> Vec<String>;

  fn define(&self, define: &str) -> Vec<String>;

  /// Where the artifact lands, e.g. `bin/app.exe`.
  fn artifact_path(&self, project: &ProjectConfig, target: &TargetConfig) -> PathBuf;

  fn output(&self, project: &ProjectConfig, target: &TargetConfig) -> Vec<String>;

  /// Separator that starts the link section, if the toolchain has one.
  fn link_section(&self) -> Vec<String>;

  fn incremental_link(&self, enabled: bool) -> Vec<String>;

  fn strip_dead_code(&self, enabled: bool) -> Vec<String>;

  fn subsystem(&self, subsystem: &Subsystem) -> Vec<String>;

  fn link_dir(&self, dir: &Path) -> Vec<String>;

  fn link_lib(&self, lib: &str) -> Vec<String>;

  /// Flags for one warning level, looked up in [`Dialect::warning_table`].
  fn warning_level(&self, level: WarningLevel) -> Vec<String> {
    self.warning_table()[level.index()].iter().map(|s| s.to_string()).collect()
  }
}

/// Reject targets the dialect cannot produce.
///
/// Run before [`synthesize`]; synthesis itself has no failure mode.
pub fn check_supported<D: Dialect + ?Sized>(dialect: &D, target: &TargetConfig) -> Result<(), ConfigError> {
  if dialect.supports(target.kind) {
    Ok(())
  } else {
    Err(ConfigError::UnsupportedArtifactKind {
      target: target.name.clone(),
      kind: target.kind,
      dialect: dialect.name().to_string(),
    })
  }
}

/// Build the invocation for `target` from its resolved `sources`.
///
/// Pure: identical inputs produce identical commands.
pub fn synthesize<D: Dialect + ?Sized>(
  dialect: &D,
  project: &ProjectConfig,
  target: &TargetConfig,
  sources: &[PathBuf],
) -> BuildCommand {
  let mut args = Vec::new();

  args.extend(dialect.base_flags());
  args.extend(dialect.runtime_linkage(project.static_runtime, project.debug_build));
  args.extend(dialect.optimization(project.opt_level, project.intrinsics));
  args.extend(dialect.language_standard(project.language_standard));
  args.extend(dialect.debug_info(project.debug_info));
  args.extend(dialect.artifact_kind(target.kind));

  for dir in &target.include_dirs {
    args.extend(dialect.include_dir(&project.resolve(dir)));
  }

  args.extend(dialect.warning_level(target.warning_level));
  if target.warnings_as_errors {
    args.extend(dialect.warnings_as_errors());
  }

  for code in project.ignored_warnings.iter().chain(&target.ignored_warnings) {
    args.extend(dialect.ignore_warning(*code));
  }

  for define in project.common_defines.iter().chain(&target.defines) {
    args.extend(dialect.define(define));
  }

  args.extend(sources.iter().map(|s| s.to_string_lossy().into_owned()));

  args.extend(dialect.output(project, target));

  args.extend(dialect.link_section());
  args.extend(dialect.incremental_link(project.incremental_link));
  args.extend(dialect.strip_dead_code(project.strip_dead_code));
  args.extend(dialect.subsystem(&target.subsystem));
  if let Some(dir) = &target.link_dir {
    args.extend(dialect.link_dir(&project.resolve(dir)));
  }
  for lib in &target.link_libs {
    args.extend(dialect.link_lib(lib));
  }

  BuildCommand::new(dialect.program()).args(args)
}
