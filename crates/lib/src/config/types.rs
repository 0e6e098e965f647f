//! Project and target description types.
//!
//! These values are assembled once (normally through the builders in
//! [`super::builder`]) and then shared by reference with every component of a
//! build. Nothing in the crate mutates them after construction.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// The kind of artifact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
  /// A runnable program.
  Executable,
  /// A dynamically loaded library.
  SharedLibrary,
  /// An archive of object files.
  StaticLibrary,
}

impl ArtifactKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ArtifactKind::Executable => "executable",
      ArtifactKind::SharedLibrary => "shared-library",
      ArtifactKind::StaticLibrary => "static-library",
    }
  }
}

impl fmt::Display for ArtifactKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Compiler warning level, ordinal 0 through 4.
///
/// Construct from a raw ordinal with [`WarningLevel::try_from`]; values above 4
/// are rejected so every level maps to exactly one dialect flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WarningLevel {
  #[default]
  W0,
  W1,
  W2,
  W3,
  W4,
}

impl WarningLevel {
  pub const ALL: [WarningLevel; 5] = [
    WarningLevel::W0,
    WarningLevel::W1,
    WarningLevel::W2,
    WarningLevel::W3,
    WarningLevel::W4,
  ];

  /// Index into a five-entry flag table.
  pub fn index(self) -> usize {
    self as usize
  }
}

impl TryFrom<u8> for WarningLevel {
  type Error = ConfigError;

  fn try_from(level: u8) -> Result<Self, Self::Error> {
    WarningLevel::ALL
      .get(usize::from(level))
      .copied()
      .ok_or(ConfigError::InvalidWarningLevel(level))
  }
}

impl From<WarningLevel> for u8 {
  fn from(level: WarningLevel) -> u8 {
    level as u8
  }
}

/// Target subsystem tag (e.g. `console`, `windows`).
///
/// Tags compare case-insensitively; [`Subsystem::canonical`] yields the
/// upper-cased spelling that dialects emit.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subsystem(String);

impl Subsystem {
  pub fn new(tag: impl Into<String>) -> Self {
    Self(tag.into())
  }

  pub fn console() -> Self {
    Self::new(crate::consts::DEFAULT_SUBSYSTEM)
  }

  /// The tag as declared.
  pub fn as_declared(&self) -> &str {
    &self.0
  }

  /// The tag upper-cased, e.g. `CONSOLE`.
  pub fn canonical(&self) -> String {
    self.0.to_ascii_uppercase()
  }

  pub fn is_console(&self) -> bool {
    self.0.eq_ignore_ascii_case(crate::consts::DEFAULT_SUBSYSTEM)
  }
}

impl Default for Subsystem {
  fn default() -> Self {
    Self::console()
  }
}

impl PartialEq for Subsystem {
  fn eq(&self, other: &Self) -> bool {
    self.0.eq_ignore_ascii_case(&other.0)
  }
}

impl std::hash::Hash for Subsystem {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.canonical().hash(state);
  }
}

impl fmt::Display for Subsystem {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// How a target's source files are obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceRule {
  /// A single file, relative to the project root unless absolute.
  File { path: PathBuf },

  /// Every regular file beneath `root` whose name ends with one of `suffixes`.
  Discover { root: PathBuf, suffixes: Vec<String> },
}

impl SourceRule {
  pub fn file(path: impl Into<PathBuf>) -> Self {
    SourceRule::File { path: path.into() }
  }

  /// Discovery rule from a comma-separated suffix list such as `".cpp,.cc"`.
  ///
  /// Suffixes are matched literally, so callers should include the `.`.
  pub fn discover(root: impl Into<PathBuf>, suffixes: &str) -> Self {
    SourceRule::Discover {
      root: root.into(),
      suffixes: parse_suffix_list(suffixes),
    }
  }
}

/// Split a comma-separated suffix list, dropping empty entries.
pub fn parse_suffix_list(list: &str) -> Vec<String> {
  list
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}

/// One buildable artifact within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
  /// Unique name; also the artifact's base file name.
  pub name: String,

  pub kind: ArtifactKind,

  pub warning_level: WarningLevel,

  pub warnings_as_errors: bool,

  /// Warning codes disabled for this target only.
  pub ignored_warnings: Vec<u32>,

  /// Target-specific preprocessor defines, emitted after the project's.
  pub defines: Vec<String>,

  pub include_dirs: Vec<PathBuf>,

  pub sources: Vec<SourceRule>,

  /// Libraries to link, in declared order.
  pub link_libs: Vec<String>,

  pub link_dir: Option<PathBuf>,

  pub subsystem: Subsystem,

  /// Names of earlier targets this target consumes.
  ///
  /// Used by the incremental planner: a rebuilt dependency forces a rebuild.
  pub deps: Vec<String>,
}

/// A named collection of targets sharing global compiler and linker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
  pub name: String,

  /// Declared location of the project; every relative path resolves here.
  pub root: PathBuf,

  /// Language standard version, e.g. `14` for C++14.
  pub language_standard: u32,

  pub bin_dir: PathBuf,

  pub obj_dir: PathBuf,

  pub debug_build: bool,

  /// Link the language runtime statically.
  pub static_runtime: bool,

  /// Optimization level, 0 through 3.
  pub opt_level: u8,

  pub intrinsics: bool,

  pub debug_info: bool,

  pub incremental_link: bool,

  /// Remove unreferenced functions and data at link time.
  pub strip_dead_code: bool,

  pub common_defines: Vec<String>,

  /// Warning codes disabled for every target.
  pub ignored_warnings: Vec<u32>,

  /// Targets in dependency order.
  pub targets: Vec<TargetConfig>,
}

impl ProjectConfig {
  /// Resolve `path` against the project's declared root.
  pub fn resolve(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.root.join(path)
    }
  }

  pub fn bin_path(&self) -> PathBuf {
    self.resolve(&self.bin_dir)
  }

  pub fn obj_path(&self) -> PathBuf {
    self.resolve(&self.obj_dir)
  }

  /// Resolve each directory in `dirs` against the declared root.
  pub fn relative_dirs<P: AsRef<Path>>(&self, dirs: &[P]) -> Vec<PathBuf> {
    dirs.iter().map(|d| self.resolve(d.as_ref())).collect()
  }

  pub fn find_target(&self, name: &str) -> Option<&TargetConfig> {
    self.targets.iter().find(|t| t.name == name)
  }
}
