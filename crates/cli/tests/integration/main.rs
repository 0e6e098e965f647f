//! CLI integration tests that build the demo layout with a stand-in compiler.

#[cfg(unix)]
mod common;

#[cfg(unix)]
mod build_tests;
