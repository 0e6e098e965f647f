//! GCC/Clang style flag dialect (`c++`, `g++`, `clang++`).

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX, EXE_SUFFIX};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{ArtifactKind, ProjectConfig, Subsystem, TargetConfig};

use super::Dialect;

const WARNING_TABLE: [&[&str]; 5] = [
  &["-w"],
  &["-Wall"],
  &["-Wall", "-Wextra"],
  &["-Wall", "-Wextra", "-Wpedantic"],
  &["-Wall", "-Wextra", "-Wpedantic", "-Wshadow", "-Wconversion"],
];

/// A GNU-compatible driver compiling and linking in a single invocation.
///
/// Numeric warning codes have no GNU spelling and are dropped. Static
/// libraries need `ar` and are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gnu {
  program: String,
}

impl Gnu {
  pub fn new(program: impl Into<String>) -> Self {
    Self { program: program.into() }
  }
}

impl Default for Gnu {
  fn default() -> Self {
    Self::new("c++")
  }
}

fn flag(s: impl Into<String>) -> Vec<String> {
  vec![s.into()]
}

impl Dialect for Gnu {
  fn name(&self) -> &str {
    "gnu"
  }

  fn program(&self) -> &str {
    &self.program
  }

  fn supports(&self, kind: ArtifactKind) -> bool {
    matches!(kind, ArtifactKind::Executable | ArtifactKind::SharedLibrary)
  }

  fn base_flags(&self) -> Vec<String> {
    ["-fno-rtti", "-fno-exceptions"].iter().map(|s| s.to_string()).collect()
  }

  fn runtime_linkage(&self, static_runtime: bool, debug_build: bool) -> Vec<String> {
    let mut flags = Vec::new();
    if static_runtime {
      flags.push("-static-libstdc++".to_string());
    }
    if debug_build {
      flags.push("-D_GLIBCXX_DEBUG".to_string());
    }
    flags
  }

  fn optimization(&self, level: u8, intrinsics: bool) -> Vec<String> {
    let mut flags = flag(format!("-O{}", level));
    if !intrinsics {
      flags.push("-fno-builtin".to_string());
    }
    flags
  }

  fn language_standard(&self, version: u32) -> Vec<String> {
    flag(format!("-std=c++{}", version))
  }

  fn debug_info(&self, enabled: bool) -> Vec<String> {
    if enabled { flag("-g") } else { Vec::new() }
  }

  fn artifact_kind(&self, kind: ArtifactKind) -> Vec<String> {
    match kind {
      ArtifactKind::SharedLibrary => vec!["-shared".to_string(), "-fPIC".to_string()],
      ArtifactKind::Executable | ArtifactKind::StaticLibrary => Vec::new(),
    }
  }

  fn include_dir(&self, dir: &Path) -> Vec<String> {
    flag(format!("-I{}", dir.display()))
  }

  fn warning_table(&self) -> &[&'static [&'static str]; 5] {
    &WARNING_TABLE
  }

  fn warnings_as_errors(&self) -> Vec<String> {
    flag("-Werror")
  }

  fn ignore_warning(&self, code: u32) -> Vec<String> {
    debug!(code, "numeric warning codes have no gnu spelling, ignoring");
    Vec::new()
  }

  fn define(&self, define: &str) -> Vec<String> {
    flag(format!("-D{}", define))
  }

  fn artifact_path(&self, project: &ProjectConfig, target: &TargetConfig) -> PathBuf {
    let file_name = match target.kind {
      ArtifactKind::Executable => format!("{}{}", target.name, EXE_SUFFIX),
      ArtifactKind::SharedLibrary => format!("{}{}{}", DLL_PREFIX, target.name, DLL_SUFFIX),
      ArtifactKind::StaticLibrary => format!("lib{}.a", target.name),
    };
    project.bin_path().join(file_name)
  }

  fn output(&self, project: &ProjectConfig, target: &TargetConfig) -> Vec<String> {
    vec!["-o".to_string(), self.artifact_path(project, target).display().to_string()]
  }

  fn link_section(&self) -> Vec<String> {
    Vec::new()
  }

  fn incremental_link(&self, _enabled: bool) -> Vec<String> {
    Vec::new()
  }

  fn strip_dead_code(&self, enabled: bool) -> Vec<String> {
    if enabled { flag("-Wl,--gc-sections") } else { Vec::new() }
  }

  fn subsystem(&self, subsystem: &Subsystem) -> Vec<String> {
    if subsystem.is_console() {
      Vec::new()
    } else {
      flag(format!("-Wl,--subsystem,{}", subsystem.as_declared().to_ascii_lowercase()))
    }
  }

  fn link_dir(&self, dir: &Path) -> Vec<String> {
    flag(format!("-L{}", dir.display()))
  }

  /// Bare names become `-l<name>`; anything that looks like a file is passed through.
  fn link_lib(&self, lib: &str) -> Vec<String> {
    let path = Path::new(lib);
    if path.extension().is_some() || path.components().count() > 1 {
      flag(lib)
    } else {
      flag(format!("-l{}", lib))
    }
  }
}
