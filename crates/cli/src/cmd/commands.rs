//! Implementation of the `forge commands` command.
//!
//! Prints the command line every target would run, without running anything.

use anyhow::{Context, Result};

use forge_lib::build::preview;
use forge_lib::command::Dialect;
use forge_lib::config::ProjectConfig;
use forge_lib::discover::StdFileTree;

use crate::output::{OutputFormat, print_json, symbols};

pub fn cmd_commands(project: &ProjectConfig, dialect: &dyn Dialect, format: OutputFormat) -> Result<i32> {
  let planned = preview(project, dialect, &StdFileTree).context("Failed to plan build commands")?;

  if format.is_json() {
    print_json(&planned)?;
    return Ok(0);
  }

  for step in &planned {
    println!("{} {} {}", step.target, symbols::ARROW, step.artifact.display());
    println!("  {}", step.command);
  }

  Ok(0)
}
