//! Shared utilities.
//!
//! Test helpers for running portable shell snippets and shifting file
//! modification times.

#[cfg(test)]
pub mod testutil;
