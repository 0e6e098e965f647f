//! Project configuration model.
//!
//! A [`ProjectConfig`] describes everything needed to synthesize toolchain
//! invocations for a set of targets. It is built once, validated, and then
//! passed by reference to discovery, synthesis, planning and orchestration.

pub mod builder;
pub mod types;

use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;

pub use builder::{ProjectBuilder, TargetBuilder};
pub use types::{ArtifactKind, ProjectConfig, SourceRule, Subsystem, TargetConfig, WarningLevel, parse_suffix_list};

/// Highest accepted optimization level.
pub const MAX_OPT_LEVEL: u8 = 3;

/// Errors detected in a project description before any build step runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("project name must not be empty")]
  EmptyProjectName,

  #[error("target name must not be empty")]
  EmptyTargetName,

  #[error("duplicate target name: {0}")]
  DuplicateTarget(String),

  #[error("target {0} resolved to no source files")]
  EmptySources(String),

  #[error("target {target}: artifact kind {kind} is not supported by the {dialect} dialect")]
  UnsupportedArtifactKind {
    target: String,
    kind: ArtifactKind,
    dialect: String,
  },

  #[error("warning level {0} is out of range (expected 0-4)")]
  InvalidWarningLevel(u8),

  #[error("optimization level {0} is out of range (expected 0-{MAX_OPT_LEVEL})")]
  InvalidOptLevel(u8),

  #[error("target {target} depends on unknown target {dependency}")]
  UnknownDependency { target: String, dependency: String },

  #[error("target {target} depends on {dependency}, which must be declared before it")]
  DependencyOrder { target: String, dependency: String },
}

impl ProjectConfig {
  /// Start building a project named `name` declared at `root`.
  pub fn builder(name: impl Into<String>, root: impl Into<PathBuf>) -> ProjectBuilder {
    ProjectBuilder::new(name, root)
  }

  /// Check the structural invariants of the project.
  ///
  /// - project and target names are non-empty
  /// - target names are unique
  /// - the optimization level is in range
  /// - every dependency names a target declared earlier
  ///
  /// Source resolution and dialect support are checked by the orchestrator,
  /// which has the file system and dialect at hand.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.name.trim().is_empty() {
      return Err(ConfigError::EmptyProjectName);
    }

    if self.opt_level > MAX_OPT_LEVEL {
      return Err(ConfigError::InvalidOptLevel(self.opt_level));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for target in &self.targets {
      if target.name.trim().is_empty() {
        return Err(ConfigError::EmptyTargetName);
      }

      for dep in &target.deps {
        if !seen.contains(dep.as_str()) {
          let err = if self.find_target(dep).is_some() {
            ConfigError::DependencyOrder {
              target: target.name.clone(),
              dependency: dep.clone(),
            }
          } else {
            ConfigError::UnknownDependency {
              target: target.name.clone(),
              dependency: dep.clone(),
            }
          };
          return Err(err);
        }
      }

      if !seen.insert(target.name.as_str()) {
        return Err(ConfigError::DuplicateTarget(target.name.clone()));
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn target(name: &str) -> TargetBuilder {
    TargetConfig::builder(name, ArtifactKind::Executable).source("main.cpp")
  }

  fn project() -> ProjectBuilder {
    ProjectConfig::builder("demo", "/work/demo")
  }

  #[test]
  fn valid_project_passes() {
    let config = project()
      .target(TargetConfig::builder("lib", ArtifactKind::SharedLibrary).source("lib.cpp"))
      .target(target("app").dep("lib"))
      .build()
      .unwrap();

    assert_eq!(config.targets.len(), 2);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn duplicate_target_names_rejected() {
    let err = project().target(target("app")).target(target("app")).build().unwrap_err();
    assert_eq!(err, ConfigError::DuplicateTarget("app".to_string()));
  }

  #[test]
  fn dependency_declared_later_rejected() {
    let err = project()
      .target(target("app").dep("lib"))
      .target(TargetConfig::builder("lib", ArtifactKind::SharedLibrary).source("lib.cpp"))
      .build()
      .unwrap_err();

    assert_eq!(
      err,
      ConfigError::DependencyOrder {
        target: "app".to_string(),
        dependency: "lib".to_string(),
      }
    );
  }

  #[test]
  fn unknown_dependency_rejected() {
    let err = project().target(target("app").dep("missing")).build().unwrap_err();
    assert!(matches!(err, ConfigError::UnknownDependency { .. }));
  }

  #[test]
  fn self_dependency_rejected() {
    let err = project().target(target("app").dep("app")).build().unwrap_err();
    assert!(matches!(err, ConfigError::DependencyOrder { .. }));
  }

  #[test]
  fn opt_level_out_of_range_rejected() {
    let err = project().opt_level(4).target(target("app")).build().unwrap_err();
    assert_eq!(err, ConfigError::InvalidOptLevel(4));
  }

  #[test]
  fn empty_names_rejected() {
    assert_eq!(
      ProjectConfig::builder("  ", "/work/demo").build().unwrap_err(),
      ConfigError::EmptyProjectName
    );
    assert_eq!(
      project().target(target("")).build().unwrap_err(),
      ConfigError::EmptyTargetName
    );
  }

  #[test]
  fn struct_literal_edits_are_caught_by_validate() {
    let mut config = project().target(target("app")).build().unwrap();
    config.targets.push(config.targets[0].clone());
    assert_eq!(config.validate(), Err(ConfigError::DuplicateTarget("app".to_string())));
  }
}
