//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// Re-encodes a directory tree.
pub mod encode;

/// Writes the CSV/TSV media report.
pub mod report;
