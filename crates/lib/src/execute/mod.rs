//! Child process execution.
//!
//! A [`BuildCommand`] is spawned with piped stdout and stderr and a null
//! stdin, inheriting the working directory and environment. Both pipes are
//! drained concurrently with each other and with the wait for exit, so a
//! child writing more than a pipe buffer's worth of output can never block
//! on a full pipe.

use std::future::Future;
use std::io;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::command::BuildCommand;

/// Exit code reported when the child was terminated without one (e.g. by a signal).
pub const NO_EXIT_CODE: i32 = -1;

/// Errors from spawning or draining a child process.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The process could not be created at all.
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  /// Reading the child's output or waiting for it failed.
  #[error("i/o error while running {program}: {source}")]
  Io {
    program: String,
    #[source]
    source: io::Error,
  },
}

/// Outcome of one executed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
  pub exit_code: i32,
  pub stdout: String,
  pub stderr: String,
}

impl ProcessResult {
  pub fn success(&self) -> bool {
    self.exit_code == 0
  }
}

/// Runs build commands to completion.
///
/// The orchestrator and bootstrapper only see this trait, which lets tests
/// count and script invocations.
pub trait Executor {
  fn execute(&self, command: &BuildCommand) -> impl Future<Output = Result<ProcessResult, ExecuteError>>;
}

/// [`Executor`] that runs real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
  async fn execute(&self, command: &BuildCommand) -> Result<ProcessResult, ExecuteError> {
    let child = spawn(command)?;
    drain(&command.program, child).await
  }
}

/// Start `command` as a child process with captured output.
pub fn spawn(command: &BuildCommand) -> Result<Child, ExecuteError> {
  info!(cmd = %command, "spawning process");

  Command::new(&command.program)
    .args(&command.args)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .map_err(|source| ExecuteError::Spawn {
      program: command.program.clone(),
      source,
    })
}

/// Wait for `child` to exit while reading both of its output streams.
///
/// Returns once the process has exited and both streams reached end-of-stream.
pub async fn drain(program: &str, mut child: Child) -> Result<ProcessResult, ExecuteError> {
  let io_err = |source| ExecuteError::Io {
    program: program.to_string(),
    source,
  };

  let stdout = child.stdout.take();
  let stderr = child.stderr.take();

  let (stdout, stderr, status) = tokio::try_join!(read_stream(stdout), read_stream(stderr), child.wait())
    .map_err(io_err)?;

  let exit_code = status.code().unwrap_or(NO_EXIT_CODE);
  debug!(
    program,
    exit_code,
    stdout_bytes = stdout.len(),
    stderr_bytes = stderr.len(),
    "process finished"
  );

  Ok(ProcessResult {
    exit_code,
    stdout: String::from_utf8_lossy(&stdout).into_owned(),
    stderr: String::from_utf8_lossy(&stderr).into_owned(),
  })
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> io::Result<Vec<u8>> {
  let mut buf = Vec::new();
  if let Some(mut stream) = stream {
    stream.read_to_end(&mut buf).await?;
  }
  Ok(buf)
}
