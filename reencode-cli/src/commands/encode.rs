//! Implementation of the `encode` command (the default when no subcommand is
//! given).
//!
//! Builds the core configuration from the arguments, sets up diagnostic
//! logging and the interrupt handler, picks a reporter and hands over to
//! `reencode_core::process_videos`.

use crate::cli::EncodeArgs;
use crate::error::CliResult;
use crate::logging::{init_console_logging, init_file_logging};

use reencode_core::reporting::{JsonReporter, Reporter, TerminalReporter};
use reencode_core::{
    CancellationFlag, CoreConfig, FfprobeProber, RunSummary, SidecarSpawner, missing_dependencies,
    process_videos,
};

use console::style;
use log::{debug, info, warn};

/// Exit status for an interrupted run (128 + SIGINT).
pub const EXIT_CANCELLED: u8 = 130;

/// Exit status when `--strict` is set and at least one file failed.
pub const EXIT_STRICT_FAILURE: u8 = 1;

/// Creates and validates CoreConfig from CLI arguments.
pub fn create_core_config(args: &EncodeArgs) -> CliResult<CoreConfig> {
    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| args.output_dir.join("logs"));

    let mut config = CoreConfig::new(args.input_dir.clone(), args.output_dir.clone(), log_dir);
    config.keyframe_interval_secs = args.keyframe_interval;
    config.jobs = args.jobs;

    config.validate()?;
    Ok(config)
}

/// Maps a finished run to the process exit status.
pub fn exit_code(summary: &RunSummary, strict: bool) -> u8 {
    if summary.cancelled {
        EXIT_CANCELLED
    } else if strict && summary.fail > 0 {
        EXIT_STRICT_FAILURE
    } else {
        0
    }
}

/// Handles one Ctrl+C and returns the notice to print. Every press only
/// raises the flag; the encode loop kills ffmpeg and removes its partial
/// output.
fn on_interrupt(flag: &CancellationFlag) -> &'static str {
    if flag.cancel() {
        "Interrupted: stopping the current encode and cleaning up."
    } else {
        "Already stopping; waiting for ffmpeg to exit."
    }
}

fn install_interrupt_handler(cancel: &CancellationFlag, quiet: bool) {
    let flag = cancel.clone();
    let result = ctrlc::set_handler(move || {
        let notice = on_interrupt(&flag);
        if !quiet {
            eprintln!("\n{}", style(notice).yellow().bold());
        }
    });
    if let Err(e) = result {
        warn!("Failed to install Ctrl+C handler: {e}");
    }
}

/// Runs the encode command and returns the process exit status.
pub fn run_encode(args: EncodeArgs) -> CliResult<u8> {
    let config = create_core_config(&args)?;

    let log_file = if args.no_log {
        init_console_logging(args.verbose);
        None
    } else {
        Some(init_file_logging(&config.log_dir, args.verbose)?)
    };
    if let Some(path) = &log_file {
        debug!("Diagnostic log: {}", path.display());
    }
    info!(
        "Run started: input={} output={} interval={}s jobs={}",
        config.input_dir.display(),
        config.output_dir.display(),
        config.keyframe_interval_secs,
        config.effective_jobs()
    );

    let reporter: Box<dyn Reporter> = if args.progress_json {
        Box::new(JsonReporter::new())
    } else {
        Box::new(TerminalReporter::new())
    };

    for tool in missing_dependencies() {
        reporter.warning(&format!(
            "{tool} was not found on PATH; files that need it will fail"
        ));
    }

    let cancel = CancellationFlag::new();
    install_interrupt_handler(&cancel, args.progress_json);

    let summary = process_videos(
        &config,
        &FfprobeProber::new(),
        &SidecarSpawner,
        reporter.as_ref(),
        &cancel,
    )?;

    if let Some(path) = &log_file {
        info!("Diagnostic log written to {}", path.display());
    }
    Ok(exit_code(&summary, args.strict))
}
