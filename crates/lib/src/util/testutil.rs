//! Test utilities for forge-lib.
//!
//! This module provides cross-platform helpers for tests that need to execute
//! shell commands or control file timestamps.

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Returns the command and args to echo a message.
///
/// On Unix, this uses /bin/echo directly.
/// On Windows, echo is a shell builtin, so we wrap it in cmd.exe.
#[cfg(unix)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("/bin/echo", vec![msg.to_string()])
}

#[cfg(windows)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), format!("echo {}", msg)])
}

/// Create `path` (and its parents) with empty content.
pub fn write_empty(path: &Path) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, "").unwrap();
}

/// Set the modification time of `path` to `base` shifted by `offset_secs`.
///
/// Tests use explicit timestamps instead of sleeping so that coarse file
/// system clocks cannot make them flaky.
pub fn set_mtime(path: &Path, base: SystemTime, offset_secs: i64) {
  let time = if offset_secs >= 0 {
    base + Duration::from_secs(offset_secs.unsigned_abs())
  } else {
    base - Duration::from_secs(offset_secs.unsigned_abs())
  };
  File::options().write(true).open(path).unwrap().set_modified(time).unwrap();
}
