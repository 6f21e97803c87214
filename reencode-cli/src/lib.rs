// reencode-cli/src/lib.rs
//
// Library portion of the reencode CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, EncodeArgs, ReportArgs, parse_cli, parse_cli_from};
pub use commands::encode::{exit_code, run_encode};
pub use commands::report::run_report;
