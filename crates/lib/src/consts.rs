//! Crate-wide constants.

/// Application name, used in log messages and marker names.
pub const APP_NAME: &str = "forge";

/// Set on a relaunched process after a successful self-rebuild.
///
/// A process that sees this variable must never rebuild itself again.
pub const SELF_REBUILT_ENV: &str = "FORGE_SELF_REBUILT";

/// Disables the self-rebuild check entirely when set to a non-empty value.
pub const NO_SELF_REBUILD_ENV: &str = "FORGE_NO_SELF_REBUILD";

/// Suffix given to the running artifact while it is replaced on platforms
/// that refuse to overwrite an executing image.
pub const STALE_ARTIFACT_SUFFIX: &str = "old";

/// Default preprocessor defines applied to every target of a project.
pub const DEFAULT_COMMON_DEFINES: &[&str] = &["_CRT_SECURE_NO_WARNINGS"];

/// Default subsystem tag for targets.
pub const DEFAULT_SUBSYSTEM: &str = "console";
