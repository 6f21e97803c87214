//! Interactions with the external ffmpeg and ffprobe tools.
//!
//! Both tools sit behind traits ([`EncodeSpawner`], [`MediaProber`]) so the
//! orchestrator can be driven by mocks in tests. The default implementations
//! use the `ffmpeg-sidecar` and `ffprobe` crates.

use std::io;
use std::process::{Command, Stdio};

/// ffmpeg argument building and the encode/cleanup flow
pub mod ffmpeg;

/// Traits and implementations for spawning ffmpeg
pub mod ffmpeg_executor;

/// Traits and implementations for probing media with ffprobe
pub mod ffprobe_executor;

#[cfg(all(test, unix))]
pub mod mocks;

pub use ffmpeg::{AudioMode, EncodeJob, build_encode_command, invoke_encode};
pub use ffmpeg_executor::{EncodeProcess, EncodeSpawner, SidecarProcess, SidecarSpawner};
pub use ffprobe_executor::{FfprobeProber, MediaProber, ProbeResult};

/// Checks whether `cmd_name -version` can be executed.
///
/// A missing tool does not abort a run; every file will fail on its own.
/// This only lets the caller warn once up front.
pub fn check_dependency(cmd_name: &str) -> bool {
    match Command::new(cmd_name)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => {
            log::debug!("Found dependency: {cmd_name}");
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{cmd_name}' not found.");
            false
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{cmd_name}': {e}");
            false
        }
    }
}

/// Names of required tools that are not available.
pub fn missing_dependencies() -> Vec<&'static str> {
    ["ffmpeg", "ffprobe"]
        .into_iter()
        .filter(|tool| !check_dependency(tool))
        .collect()
}
