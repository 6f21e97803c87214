// reencode-cli/src/main.rs
//
// Entry point for the `reencode` binary: parse arguments, dispatch to the
// command, and turn the outcome into a process exit status.

use reencode::{Commands, parse_cli, run_encode, run_report};

use console::style;
use std::process::ExitCode;

fn main() -> ExitCode {
    let result = match parse_cli().into_command() {
        Commands::Encode(args) => run_encode(args),
        Commands::Report(args) => run_report(args).map(|_| 0),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!("{e}");
            eprintln!("{} {e}", style("Error:").red().bold());
            ExitCode::FAILURE
        }
    }
}
