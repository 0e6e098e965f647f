mod build;
mod clean;
mod commands;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use commands::cmd_commands;
