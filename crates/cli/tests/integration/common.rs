//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Demo sources written into every test root.
const DEMO_FILES: &[(&str, &str)] = &[
  ("shared_lib/src/shared_lib.h", "int lib_func(int a);\n"),
  ("shared_lib/src/shared_lib.cpp", "#include \"shared_lib.h\"\nint lib_func(int a) { return a; }\n"),
  ("executable/src/main.cpp", "#include \"shared_lib.h\"\nint main() { return lib_func(0); }\n"),
];

/// Isolated project root with a stand-in compiler.
///
/// The compiler is a shell script that records each `-o` path in a log and
/// creates that file, so runs are observable without a real toolchain.
pub struct TestEnv {
  pub temp: TempDir,
  pub compiler: PathBuf,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let env = Self {
      compiler: temp.path().join("tools").join("fake-cc"),
      temp,
    };

    for (path, content) in DEMO_FILES {
      env.write_file(&format!("project/{}", path), content);
    }
    env.install_compiler(&format!(
      r#"#!/bin/sh
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then
    shift
    out="$1"
  fi
  shift
done
echo "$out" >> "{log}"
echo "compiled $out"
touch "$out"
"#,
      log = env.log_path().display()
    ));
    env
  }

  /// Same layout, but the compiler prints diagnostics and exits with `code`.
  pub fn failing(code: i32) -> Self {
    let env = Self::new();
    env.install_compiler(&format!(
      "#!/bin/sh\necho \"shared_lib.cpp:1: error: boom\"\necho \"fatal\" 1>&2\nexit {}\n",
      code
    ));
    env
  }

  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  fn install_compiler(&self, script: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = self.compiler.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&self.compiler, script).unwrap();
    std::fs::set_permissions(&self.compiler, std::fs::Permissions::from_mode(0o755)).unwrap();
  }

  pub fn project_root(&self) -> PathBuf {
    let p = self.temp.path().join("project");
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn log_path(&self) -> PathBuf {
    self.temp.path().join("compiler.log")
  }

  /// Artifacts the stand-in compiler was asked to produce, in order.
  pub fn compiled(&self) -> Vec<String> {
    std::fs::read_to_string(self.log_path())
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }

  /// Move a project file's modification time into the future.
  pub fn touch_future(&self, relative_path: &str) {
    let path: &Path = &self.project_root().join(relative_path);
    let future = SystemTime::now() + Duration::from_secs(60);
    std::fs::File::options()
      .write(true)
      .open(path)
      .unwrap()
      .set_modified(future)
      .unwrap();
  }

  /// Get a pre-configured Command for the forge binary.
  ///
  /// Self-rebuild is disabled and the GNU dialect points at the stand-in
  /// compiler and the isolated project root.
  pub fn forge_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("forge");
    cmd.env("FORGE_NO_SELF_REBUILD", "1");
    cmd.arg("--dialect").arg("gnu");
    cmd.arg("--compiler").arg(&self.compiler);
    cmd.arg("--root").arg(self.project_root());
    cmd
  }
}
