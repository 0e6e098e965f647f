//! Implementation of the `forge build` command.
//!
//! Builds every target of the project in declared order and stops at the
//! first failure. The process exit code is the failing step's own code.

use anyhow::{Context, Result};

use forge_lib::build::{BuildOptions, BuildReport, TargetOutcome, build_project};
use forge_lib::command::Dialect;
use forge_lib::config::ProjectConfig;
use forge_lib::discover::StdFileTree;
use forge_lib::execute::ProcessExecutor;

use crate::output::{
  OutputFormat, format_elapsed, print_diagnostics, print_error, print_info, print_json, print_stat, print_success,
  symbols,
};

pub fn cmd_build(project: &ProjectConfig, dialect: &dyn Dialect, format: OutputFormat, full: bool) -> Result<i32> {
  if !format.is_json() {
    print_info(&format!("Project [{}]: {} targets.", project.name, project.targets.len()));
  }

  let options = BuildOptions { incremental: !full };

  let runtime = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")?;

  let result = runtime.block_on(build_project(project, dialect, &ProcessExecutor, &StdFileTree, options));

  match result {
    Ok(report) => {
      if format.is_json() {
        print_json(&report)?;
      } else {
        print_report(&report);
      }
      Ok(0)
    }
    Err(e) => {
      print_error(&e.to_string());
      if let Some(text) = e.diagnostics() {
        print_diagnostics(&text);
      }
      Ok(e.exit_code())
    }
  }
}

fn print_report(report: &BuildReport) {
  for target in &report.targets {
    match &target.outcome {
      TargetOutcome::Built { reason } => println!("  {} {} ({})", symbols::SUCCESS, target.name, reason),
      TargetOutcome::Skipped => println!("  {} {} (up to date)", symbols::INFO, target.name),
    }
  }

  println!();
  print_success(&format!("Build succeeded in {}", format_elapsed(report.elapsed)));
  print_stat("Built", &report.built().to_string());
  print_stat("Skipped", &report.skipped().to_string());
}
