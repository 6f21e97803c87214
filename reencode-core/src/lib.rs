//! Core library for batch re-encoding of video trees with ffmpeg and ffprobe.
//!
//! This crate walks an input directory, mirrors its layout into an output
//! directory, and encodes every supported video to H.264/AAC MP4 with
//! keyframes pinned to a fixed interval. Outputs newer than their source are
//! skipped, so a run can be repeated to pick up only what changed.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use reencode_core::{CancellationFlag, CoreConfig, FfprobeProber, SidecarSpawner, process_videos};
//! use reencode_core::reporting::TerminalReporter;
//! use std::path::PathBuf;
//!
//! let mut config = CoreConfig::new(
//!     PathBuf::from("/path/to/input"),
//!     PathBuf::from("/path/to/output"),
//!     PathBuf::from("/path/to/output/logs"),
//! );
//! config.keyframe_interval_secs = 1.0;
//! config.jobs = 2;
//! config.validate().unwrap();
//!
//! let summary = process_videos(
//!     &config,
//!     &FfprobeProber::new(),
//!     &SidecarSpawner,
//!     &TerminalReporter::new(),
//!     &CancellationFlag::new(),
//! )
//! .unwrap();
//! println!("{summary}");
//! ```

pub mod cancel;
pub mod config;
pub mod discovery;
pub mod error;
pub mod external;
pub mod file_logging;
pub mod incremental;
pub mod path_mapping;
pub mod processing;
pub mod report;
pub mod reporting;
pub mod run_log;
pub mod summary;
pub mod utils;

// Re-exports for public API
pub use cancel::CancellationFlag;
pub use config::{CoreConfig, EncoderSettings};
pub use discovery::{discover, find_processable_files};
pub use error::{CoreError, CoreResult};
pub use external::{FfprobeProber, MediaProber, SidecarSpawner, missing_dependencies};
pub use file_logging::setup_file_logging;
pub use incremental::should_skip;
pub use path_mapping::map_output_path;
pub use processing::process_videos;
pub use report::{DEFAULT_REPORT_PREFIX, FfprobeCli, write_report};
pub use reporting::{JsonReporter, NullReporter, Reporter, TerminalReporter};
pub use summary::{FailReason, Outcome, RunSummary};
