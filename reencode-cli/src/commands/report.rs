//! Implementation of the `report` command.
//!
//! Inspects every supported file under a directory with ffprobe and writes
//! `<prefix>.csv` and `<prefix>.tsv`. Run it over an output tree to confirm
//! the keyframe spacing an encode produced.

use crate::cli::ReportArgs;
use crate::error::{CliErrorContext, CliResult};
use crate::logging::init_console_logging;

use reencode_core::report::ReportFiles;
use reencode_core::{FfprobeCli, missing_dependencies, write_report};

use console::style;
use log::warn;
use std::path::PathBuf;

/// Directory the report files go to.
pub fn report_out_dir(args: &ReportArgs) -> CliResult<PathBuf> {
    match &args.out_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir().cli_context("Cannot determine current directory"),
    }
}

/// Runs the report command and prints where the files were written.
pub fn run_report(args: ReportArgs) -> CliResult<ReportFiles> {
    init_console_logging(args.verbose);

    if missing_dependencies().contains(&"ffprobe") {
        warn!("ffprobe was not found on PATH; every row will be blank");
    }

    let out_dir = report_out_dir(&args)?;
    let files = write_report(&args.dir, &out_dir, &args.output_prefix, &FfprobeCli)
        .cli_with_context(|| format!("Report for {} failed", args.dir.display()))?;

    println!("Inspected {} file(s)", style(files.rows).bold());
    println!("Wrote: {}", files.csv.display());
    println!("Wrote: {}", files.tsv.display());
    Ok(files)
}
