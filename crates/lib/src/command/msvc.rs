//! Microsoft `cl.exe` flag dialect.

use std::path::{Path, PathBuf};

use crate::config::{ArtifactKind, ProjectConfig, Subsystem, TargetConfig};

use super::Dialect;

const WARNING_TABLE: [&[&str]; 5] = [&["/W0"], &["/W1"], &["/W2"], &["/W3"], &["/W4"]];

/// `cl.exe` compiling and linking in a single invocation.
///
/// Static libraries need `lib.exe` and are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msvc {
  program: String,
}

impl Msvc {
  pub fn new(program: impl Into<String>) -> Self {
    Self { program: program.into() }
  }
}

impl Default for Msvc {
  fn default() -> Self {
    Self::new("cl.exe")
  }
}

fn flag(s: impl Into<String>) -> Vec<String> {
  vec![s.into()]
}

impl Dialect for Msvc {
  fn name(&self) -> &str {
    "msvc"
  }

  fn program(&self) -> &str {
    &self.program
  }

  fn supports(&self, kind: ArtifactKind) -> bool {
    matches!(kind, ArtifactKind::Executable | ArtifactKind::SharedLibrary)
  }

  fn base_flags(&self) -> Vec<String> {
    ["/nologo", "/Gm-", "/GR-", "/EHa-", "/FC"].iter().map(|s| s.to_string()).collect()
  }

  fn runtime_linkage(&self, static_runtime: bool, debug_build: bool) -> Vec<String> {
    let linkage = if static_runtime { "T" } else { "D" };
    let debug = if debug_build { "d" } else { "" };
    flag(format!("/M{}{}", linkage, debug))
  }

  fn optimization(&self, level: u8, intrinsics: bool) -> Vec<String> {
    let mut opt = match level {
      0 => "/Od".to_string(),
      n => format!("/O{}", n),
    };
    if intrinsics {
      opt.push('i');
    }
    flag(opt)
  }

  fn language_standard(&self, version: u32) -> Vec<String> {
    flag(format!("/std:c++{}", version))
  }

  fn debug_info(&self, enabled: bool) -> Vec<String> {
    if enabled { flag("/Z7") } else { Vec::new() }
  }

  fn artifact_kind(&self, kind: ArtifactKind) -> Vec<String> {
    match kind {
      ArtifactKind::SharedLibrary => flag("/LD"),
      ArtifactKind::Executable | ArtifactKind::StaticLibrary => Vec::new(),
    }
  }

  fn include_dir(&self, dir: &Path) -> Vec<String> {
    flag(format!("/I{}", dir.display()))
  }

  fn warning_table(&self) -> &[&'static [&'static str]; 5] {
    &WARNING_TABLE
  }

  fn warnings_as_errors(&self) -> Vec<String> {
    flag("/WX")
  }

  fn ignore_warning(&self, code: u32) -> Vec<String> {
    flag(format!("/wd{}", code))
  }

  fn define(&self, define: &str) -> Vec<String> {
    flag(format!("/D{}", define))
  }

  fn artifact_path(&self, project: &ProjectConfig, target: &TargetConfig) -> PathBuf {
    let extension = match target.kind {
      ArtifactKind::Executable => "exe",
      ArtifactKind::SharedLibrary => "dll",
      ArtifactKind::StaticLibrary => "lib",
    };
    project.bin_path().join(format!("{}.{}", target.name, extension))
  }

  fn output(&self, project: &ProjectConfig, target: &TargetConfig) -> Vec<String> {
    // cl.exe appends the extension itself; /Fo: needs a trailing separator to
    // name a directory.
    let exe = project.bin_path().join(&target.name);
    vec![
      "/Fe:".to_string(),
      exe.display().to_string(),
      "/Fo:".to_string(),
      format!("{}\\", project.obj_path().display()),
    ]
  }

  fn link_section(&self) -> Vec<String> {
    flag("/link")
  }

  fn incremental_link(&self, enabled: bool) -> Vec<String> {
    flag(if enabled { "/INCREMENTAL" } else { "/INCREMENTAL:NO" })
  }

  fn strip_dead_code(&self, enabled: bool) -> Vec<String> {
    flag(if enabled { "/OPT:REF" } else { "/OPT:NOREF" })
  }

  fn subsystem(&self, subsystem: &Subsystem) -> Vec<String> {
    flag(format!("/SUBSYSTEM:{}", subsystem.canonical()))
  }

  fn link_dir(&self, dir: &Path) -> Vec<String> {
    flag(format!("/LIBPATH:{}", dir.display()))
  }

  fn link_lib(&self, lib: &str) -> Vec<String> {
    if Path::new(lib).extension().is_some() {
      flag(lib)
    } else {
      flag(format!("{}.lib", lib))
    }
  }
}
