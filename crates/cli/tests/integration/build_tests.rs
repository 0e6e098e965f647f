//! Build command integration tests.

use predicates::prelude::*;
use serial_test::serial;

use super::common::TestEnv;

#[test]
#[serial]
fn build_runs_every_target_in_order() {
  let env = TestEnv::new();

  env
    .forge_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("Project [demo]: 2 targets."))
    .stdout(predicate::str::contains("Build succeeded in"));

  let compiled = env.compiled();
  assert_eq!(compiled.len(), 2);
  assert!(compiled[0].contains("shared_lib"));
  assert!(compiled[1].contains("executable"));
  assert!(env.project_root().join("bin").is_dir());
}

#[test]
#[serial]
fn build_is_the_default_command() {
  let env = TestEnv::new();

  env.forge_cmd().assert().success();

  assert_eq!(env.compiled().len(), 2);
}

#[test]
#[serial]
fn second_build_skips_up_to_date_targets() {
  let env = TestEnv::new();
  env.forge_cmd().arg("build").assert().success();

  env
    .forge_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("up to date"));

  assert_eq!(env.compiled().len(), 2);
}

#[test]
#[serial]
fn touching_a_library_source_rebuilds_its_dependent() {
  let env = TestEnv::new();
  env.forge_cmd().arg("build").assert().success();

  env.touch_future("shared_lib/src/shared_lib.cpp");
  env.forge_cmd().arg("build").assert().success();

  let compiled = env.compiled();
  assert_eq!(compiled.len(), 4);
  assert!(compiled[2].contains("shared_lib"));
  assert!(compiled[3].contains("executable"));
}

#[test]
#[serial]
fn full_build_ignores_up_to_date_targets() {
  let env = TestEnv::new();
  env.forge_cmd().arg("build").assert().success();

  env.forge_cmd().args(["build", "--full"]).assert().success();

  assert_eq!(env.compiled().len(), 4);
}

#[test]
#[serial]
fn failing_step_sets_exit_code_and_stops() {
  let env = TestEnv::failing(3);

  env
    .forge_cmd()
    .arg("build")
    .assert()
    .code(3)
    .stdout(predicate::str::contains("Build succeeded").not())
    .stderr(predicate::str::contains("target shared_lib failed with exit code 3"))
    .stderr(predicate::str::contains("error: boom"))
    .stderr(predicate::str::contains("fatal"));

  assert!(env.compiled().is_empty());
}

#[test]
#[serial]
fn missing_sources_fail_before_any_step() {
  let env = TestEnv::new();
  std::fs::remove_file(env.project_root().join("executable/src/main.cpp")).unwrap();

  env
    .forge_cmd()
    .arg("build")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("resolved to no source files"));

  assert!(env.compiled().is_empty());
  assert!(!env.project_root().join("bin").exists());
}

#[test]
#[serial]
fn build_report_as_json() {
  let env = TestEnv::new();

  let output = env.forge_cmd().args(["--format", "json", "build"]).output().unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["project"], "demo");
  let targets = report["targets"].as_array().unwrap();
  assert_eq!(targets.len(), 2);
  assert_eq!(targets[0]["name"], "shared_lib");
  assert_eq!(targets[0]["outcome"], "built");
}

#[test]
#[serial]
fn clean_removes_outputs() {
  let env = TestEnv::new();
  env.forge_cmd().arg("build").assert().success();

  env
    .forge_cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed"));

  assert!(!env.project_root().join("bin").exists());

  env.forge_cmd().arg("build").assert().success();
  assert_eq!(env.compiled().len(), 4);
}
