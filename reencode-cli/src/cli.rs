// reencode-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use reencode_core::DEFAULT_REPORT_PREFIX;
use reencode_core::config::{
    DEFAULT_INPUT_DIR, DEFAULT_JOBS, DEFAULT_KEYFRAME_INTERVAL_SECS, DEFAULT_OUTPUT_DIR,
};
use std::ffi::OsString;
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "reencode: batch re-encoding with fixed keyframe spacing",
    long_about = "Re-encodes every video under a directory to H.264/AAC MP4 with keyframes \
                  at a fixed interval, mirroring the directory layout. Outputs newer than \
                  their source are skipped.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Arguments for the default `encode` command
    #[command(flatten)]
    pub encode: EncodeArgs,
}

impl Cli {
    /// The command to run; bare arguments mean `encode`.
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Encode(self.encode))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Re-encodes every video under INPUT_DIR into OUTPUT_DIR (default command)
    Encode(EncodeArgs),
    /// Writes a CSV/TSV table of stream timing and keyframe spacing
    Report(ReportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EncodeArgs {
    /// Directory to scan for source videos
    #[arg(value_name = "INPUT_DIR", default_value = DEFAULT_INPUT_DIR)]
    pub input_dir: PathBuf,

    /// Root of the mirrored output tree
    #[arg(value_name = "OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Seconds between forced keyframes
    #[arg(value_name = "SECONDS", default_value_t = DEFAULT_KEYFRAME_INTERVAL_SECS)]
    pub keyframe_interval: f64,

    /// Concurrent encodes (0 = one per logical CPU)
    #[arg(short, long, value_name = "N", env = "REENCODE_JOBS", default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,

    /// Exit with status 1 if any file failed
    #[arg(long)]
    pub strict: bool,

    /// Emit progress as JSON lines on stdout instead of the terminal display
    #[arg(long)]
    pub progress_json: bool,

    /// Debug-level diagnostic logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not write a diagnostic log file; log warnings to stderr instead
    #[arg(long)]
    pub no_log: bool,

    /// Directory for diagnostic log files (defaults to OUTPUT_DIR/logs)
    #[arg(short, long, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Directory to inspect
    #[arg(value_name = "DIR", default_value = DEFAULT_INPUT_DIR)]
    pub dir: PathBuf,

    /// File name stem for the .csv and .tsv files
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_REPORT_PREFIX)]
    pub output_prefix: String,

    /// Where to write the report (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Debug-level logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

pub fn parse_cli_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args)
}
