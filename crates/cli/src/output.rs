//! CLI output formatting utilities.
//!
//! Status lines go to stdout, failures and the argument echo to stderr. JSON
//! output is the only thing written to stdout in `--format json` mode.

use std::ffi::OsString;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

/// Elapsed build time: milliseconds below two seconds, seconds above.
pub fn format_elapsed(duration: Duration) -> String {
  if duration < Duration::from_secs(2) {
    format!("{}ms", duration.as_millis())
  } else {
    format!("{:.3}s", duration.as_secs_f64())
  }
}

/// Echo the raw argument list, one `argv[n]` line each.
pub fn print_args<I: IntoIterator<Item = OsString>>(args: I) {
  for (i, arg) in args.into_iter().enumerate() {
    eprintln!(
      "{}",
      format!("argv[{}] = '{}'", i, arg.to_string_lossy()).if_supports_color(Stream::Stderr, |s| s.dimmed())
    );
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// Captured compiler output of a failed step, indented under the error line.
pub fn print_diagnostics(text: &str) {
  for line in text.lines() {
    eprintln!("    {}", line);
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
