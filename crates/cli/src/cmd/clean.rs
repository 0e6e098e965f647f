//! Implementation of the `forge clean` command.

use anyhow::{Context, Result};

use forge_lib::build::clean;
use forge_lib::config::ProjectConfig;

use crate::output::{OutputFormat, print_info, print_json, print_success};

pub fn cmd_clean(project: &ProjectConfig, format: OutputFormat) -> Result<i32> {
  let removed = clean(project).context("Failed to remove output directories")?;

  if format.is_json() {
    print_json(&serde_json::json!({ "removed": removed }))?;
  } else if removed.is_empty() {
    print_info("Nothing to clean");
  } else {
    for dir in &removed {
      print_success(&format!("Removed {}", dir.display()));
    }
  }

  Ok(0)
}
