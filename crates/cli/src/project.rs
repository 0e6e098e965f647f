//! The project forge builds.
//!
//! A shared library exporting `lib_func` and an executable that links it.
//! Sources live under `demos/` next to this crate unless `--root` points
//! somewhere else with the same layout.

use std::path::{Path, PathBuf};

use forge_lib::config::{ArtifactKind, ConfigError, ProjectConfig, TargetConfig};
use forge_lib::config_root;

/// Layout-relative directory of the bundled demo sources.
pub const DEMO_DIR: &str = "demos";

pub fn default_root() -> PathBuf {
  config_root!().join(DEMO_DIR)
}

pub fn demo_project(root: Option<&Path>) -> Result<ProjectConfig, ConfigError> {
  let root = root.map(Path::to_path_buf).unwrap_or_else(default_root);

  ProjectConfig::builder("demo", root)
    .language_standard(14)
    .debug_build(true)
    .static_runtime(true)
    .opt_level(0)
    .intrinsics(true)
    .target(
      TargetConfig::builder("shared_lib", ArtifactKind::SharedLibrary)
        .define("RH_EXPORT")
        .include_dir("shared_lib/src")
        .discover("shared_lib/src", ".cpp")
        .warning_level(4)
        .warnings_as_errors(true),
    )
    .target(
      TargetConfig::builder("executable", ArtifactKind::Executable)
        .dep("shared_lib")
        .link_dir("bin")
        .link_lib("shared_lib")
        .include_dir("executable/src")
        .include_dir("shared_lib/src")
        .discover("executable/src", ".cpp,.cc")
        .warning_level(4)
        .warnings_as_errors(true)
        .subsystem("console"),
    )
    .build()
}
