//! forge-lib: the build orchestration core of forge.
//!
//! A project is described in code as a [`config::ProjectConfig`] and built
//! target by target:
//! - `discover`: recursive source discovery over a [`discover::FileTree`]
//! - `command`: pure synthesis of one toolchain invocation per target, spelled
//!   by a pluggable [`command::Dialect`]
//! - `execute`: child processes with concurrently drained output
//! - `incremental`: timestamp staleness and per-target skip decisions
//! - `build`: the sequential, fail-fast orchestrator
//! - `bootstrap`: rebuild and relaunch the tool itself when its sources change

pub mod bootstrap;
pub mod build;
pub mod command;
pub mod config;
pub mod consts;
pub mod discover;
pub mod execute;
pub mod incremental;
pub mod util;
