//! Builders for [`ProjectConfig`] and [`TargetConfig`].
//!
//! ```ignore
//! let project = ProjectConfig::builder("test", forge_lib::config_root!())
//!   .language_standard(14)
//!   .bin_dir("bin")
//!   .obj_dir("bin/int")
//!   .target(
//!     TargetConfig::builder("shared_lib", ArtifactKind::SharedLibrary)
//!       .define("RH_EXPORT")
//!       .include_dir("shared_lib/src")
//!       .discover("shared_lib/src", ".cpp"),
//!   )
//!   .build()?;
//! ```

use std::path::PathBuf;

use super::types::{ArtifactKind, ProjectConfig, SourceRule, Subsystem, TargetConfig, WarningLevel};
use super::ConfigError;
use crate::consts::DEFAULT_COMMON_DEFINES;

/// Directory of the crate invoking the macro.
///
/// Use it as a project root so that source discovery does not depend on the
/// directory the host program is launched from.
#[macro_export]
macro_rules! config_root {
  () => {
    ::std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
  };
}

/// Incrementally assembles a [`ProjectConfig`].
#[derive(Debug, Clone)]
pub struct ProjectBuilder {
  name: String,
  root: PathBuf,
  language_standard: u32,
  bin_dir: PathBuf,
  obj_dir: PathBuf,
  debug_build: bool,
  static_runtime: bool,
  opt_level: u8,
  intrinsics: bool,
  debug_info: bool,
  incremental_link: bool,
  strip_dead_code: bool,
  common_defines: Vec<String>,
  ignored_warnings: Vec<u32>,
  targets: Vec<TargetBuilder>,
}

impl ProjectBuilder {
  /// `root` is the declared location of the project; every relative path
  /// resolves against it.
  pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
    Self {
      name: name.into(),
      root: root.into(),
      language_standard: 14,
      bin_dir: PathBuf::from("bin"),
      obj_dir: PathBuf::from("bin").join("int"),
      debug_build: false,
      static_runtime: false,
      opt_level: 0,
      intrinsics: false,
      debug_info: true,
      incremental_link: false,
      strip_dead_code: true,
      common_defines: DEFAULT_COMMON_DEFINES.iter().map(|d| d.to_string()).collect(),
      ignored_warnings: Vec::new(),
      targets: Vec::new(),
    }
  }

  pub fn language_standard(mut self, version: u32) -> Self {
    self.language_standard = version;
    self
  }

  pub fn bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.bin_dir = dir.into();
    self
  }

  pub fn obj_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.obj_dir = dir.into();
    self
  }

  pub fn debug_build(mut self, enabled: bool) -> Self {
    self.debug_build = enabled;
    self
  }

  pub fn static_runtime(mut self, enabled: bool) -> Self {
    self.static_runtime = enabled;
    self
  }

  pub fn opt_level(mut self, level: u8) -> Self {
    self.opt_level = level;
    self
  }

  pub fn intrinsics(mut self, enabled: bool) -> Self {
    self.intrinsics = enabled;
    self
  }

  pub fn debug_info(mut self, enabled: bool) -> Self {
    self.debug_info = enabled;
    self
  }

  pub fn incremental_link(mut self, enabled: bool) -> Self {
    self.incremental_link = enabled;
    self
  }

  pub fn strip_dead_code(mut self, enabled: bool) -> Self {
    self.strip_dead_code = enabled;
    self
  }

  pub fn common_define(mut self, define: impl Into<String>) -> Self {
    self.common_defines.push(define.into());
    self
  }

  /// Replace the common defines, including the defaults.
  pub fn common_defines<I, S>(mut self, defines: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.common_defines = defines.into_iter().map(Into::into).collect();
    self
  }

  pub fn ignore_warning(mut self, code: u32) -> Self {
    self.ignored_warnings.push(code);
    self
  }

  /// Append a target. Targets build in the order they are added.
  pub fn target(mut self, target: TargetBuilder) -> Self {
    self.targets.push(target);
    self
  }

  /// Finish the project and validate it.
  pub fn build(self) -> Result<ProjectConfig, ConfigError> {
    let targets = self
      .targets
      .into_iter()
      .map(TargetBuilder::build)
      .collect::<Result<Vec<_>, _>>()?;

    let root = dunce::canonicalize(&self.root).unwrap_or(self.root);

    let config = ProjectConfig {
      name: self.name,
      root,
      language_standard: self.language_standard,
      bin_dir: self.bin_dir,
      obj_dir: self.obj_dir,
      debug_build: self.debug_build,
      static_runtime: self.static_runtime,
      opt_level: self.opt_level,
      intrinsics: self.intrinsics,
      debug_info: self.debug_info,
      incremental_link: self.incremental_link,
      strip_dead_code: self.strip_dead_code,
      common_defines: self.common_defines,
      ignored_warnings: self.ignored_warnings,
      targets,
    };

    config.validate()?;
    Ok(config)
  }
}

/// Incrementally assembles a [`TargetConfig`].
#[derive(Debug, Clone)]
pub struct TargetBuilder {
  name: String,
  kind: ArtifactKind,
  warning_level: u8,
  warnings_as_errors: bool,
  ignored_warnings: Vec<u32>,
  defines: Vec<String>,
  include_dirs: Vec<PathBuf>,
  sources: Vec<SourceRule>,
  link_libs: Vec<String>,
  link_dir: Option<PathBuf>,
  subsystem: Subsystem,
  deps: Vec<String>,
}

impl TargetConfig {
  pub fn builder(name: impl Into<String>, kind: ArtifactKind) -> TargetBuilder {
    TargetBuilder::new(name, kind)
  }
}

impl TargetBuilder {
  pub fn new(name: impl Into<String>, kind: ArtifactKind) -> Self {
    Self {
      name: name.into(),
      kind,
      warning_level: 0,
      warnings_as_errors: false,
      ignored_warnings: Vec::new(),
      defines: Vec::new(),
      include_dirs: Vec::new(),
      sources: Vec::new(),
      link_libs: Vec::new(),
      link_dir: None,
      subsystem: Subsystem::console(),
      deps: Vec::new(),
    }
  }

  /// Warning level ordinal; anything above 4 fails at [`TargetBuilder::build`].
  pub fn warning_level(mut self, level: u8) -> Self {
    self.warning_level = level;
    self
  }

  pub fn warnings_as_errors(mut self, enabled: bool) -> Self {
    self.warnings_as_errors = enabled;
    self
  }

  pub fn ignore_warning(mut self, code: u32) -> Self {
    self.ignored_warnings.push(code);
    self
  }

  pub fn define(mut self, define: impl Into<String>) -> Self {
    self.defines.push(define.into());
    self
  }

  pub fn include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.include_dirs.push(dir.into());
    self
  }

  pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
    self.sources.push(SourceRule::file(path));
    self
  }

  /// Add every file under `root` ending in one of the comma-separated `suffixes`.
  pub fn discover(mut self, root: impl Into<PathBuf>, suffixes: &str) -> Self {
    self.sources.push(SourceRule::discover(root, suffixes));
    self
  }

  pub fn link_lib(mut self, lib: impl Into<String>) -> Self {
    self.link_libs.push(lib.into());
    self
  }

  pub fn link_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.link_dir = Some(dir.into());
    self
  }

  pub fn subsystem(mut self, tag: impl Into<String>) -> Self {
    self.subsystem = Subsystem::new(tag);
    self
  }

  /// Declare that this target consumes the output of an earlier target.
  pub fn dep(mut self, name: impl Into<String>) -> Self {
    self.deps.push(name.into());
    self
  }

  pub fn build(self) -> Result<TargetConfig, ConfigError> {
    let warning_level = WarningLevel::try_from(self.warning_level)?;

    Ok(TargetConfig {
      name: self.name,
      kind: self.kind,
      warning_level,
      warnings_as_errors: self.warnings_as_errors,
      ignored_warnings: self.ignored_warnings,
      defines: self.defines,
      include_dirs: self.include_dirs,
      sources: self.sources,
      link_libs: self.link_libs,
      link_dir: self.link_dir,
      subsystem: self.subsystem,
      deps: self.deps,
    })
  }
}
