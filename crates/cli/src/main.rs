mod cmd;
mod output;
mod project;
mod self_build;

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use forge_lib::command::{Dialect, Gnu, Msvc};
use forge_lib::consts::NO_SELF_REBUILD_ENV;

use crate::cmd::{cmd_build, cmd_clean, cmd_commands};
use crate::output::{OutputFormat, print_args};

/// Self-hosting build tool for native C++ projects.
#[derive(Parser)]
#[command(name = "forge")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Compiler flag dialect
  #[arg(long, global = true, value_enum, default_value_t = DialectKind::native())]
  dialect: DialectKind,

  /// Compiler program to invoke instead of the dialect's default
  #[arg(long, global = true)]
  compiler: Option<String>,

  /// Project root (default: the bundled demo project)
  #[arg(long, global = true)]
  root: Option<PathBuf>,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t)]
  format: OutputFormat,

  /// Do not rebuild forge itself when its sources changed
  #[arg(long, global = true)]
  no_self_rebuild: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Build every target in declared order (default)
  Build {
    /// Rebuild every target even if it is up to date
    #[arg(long)]
    full: bool,
  },

  /// Print the toolchain command of every target without running it
  Commands,

  /// Remove the project's output directories
  Clean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DialectKind {
  Msvc,
  Gnu,
}

impl DialectKind {
  fn native() -> Self {
    if cfg!(windows) { DialectKind::Msvc } else { DialectKind::Gnu }
  }

  fn dialect(self, compiler: Option<String>) -> Box<dyn Dialect> {
    match (self, compiler) {
      (DialectKind::Msvc, Some(program)) => Box::new(Msvc::new(program)),
      (DialectKind::Msvc, None) => Box::new(Msvc::default()),
      (DialectKind::Gnu, Some(program)) => Box::new(Gnu::new(program)),
      (DialectKind::Gnu, None) => Box::new(Gnu::default()),
    }
  }
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

/// Whether any of `flags` appears verbatim after the program name.
///
/// Used before clap runs, when a stale binary must not interpret arguments yet.
fn has_flag(args: &[OsString], flags: &[&str]) -> bool {
  args
    .iter()
    .skip(1)
    .any(|arg| flags.iter().any(|flag| arg.as_os_str() == OsStr::new(flag)))
}

fn self_rebuild_enabled(args: &[OsString]) -> bool {
  !has_flag(args, &["--no-self-rebuild"]) && std::env::var_os(NO_SELF_REBUILD_ENV).is_none_or(|v| v.is_empty())
}

fn main() -> Result<()> {
  let args: Vec<OsString> = std::env::args_os().collect();
  print_args(args.iter().cloned());
  init_tracing(has_flag(&args, &["-v", "--verbose"]));

  if self_rebuild_enabled(&args)
    && let Some(exit_code) = self_build::bootstrap().context("Self-rebuild failed")?
  {
    std::process::exit(exit_code);
  }

  let cli = Cli::parse_from(args);
  debug!(verbose = cli.verbose, no_self_rebuild = cli.no_self_rebuild, "arguments parsed");
  let project = project::demo_project(cli.root.as_deref()).context("Invalid project configuration")?;
  let dialect = cli.dialect.dialect(cli.compiler);

  let exit_code = match cli.command.unwrap_or(Commands::Build { full: false }) {
    Commands::Build { full } => cmd_build(&project, dialect.as_ref(), cli.format, full)?,
    Commands::Commands => cmd_commands(&project, dialect.as_ref(), cli.format)?,
    Commands::Clean => cmd_clean(&project, cli.format)?,
  };

  if exit_code != 0 {
    std::process::exit(exit_code);
  }
  Ok(())
}
