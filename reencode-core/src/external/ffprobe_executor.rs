//! FFprobe integration for the per-file probe.
//!
//! Only two facts are needed: the first video stream's average frame rate
//! and whether any audio stream exists. Missing fields are not errors; the
//! caller applies fallbacks. When ffprobe ran but its answer is unusable,
//! audio presence is reported as unknown rather than absent.

use crate::error::{CoreError, CoreResult};
use ffprobe::{FfProbe, FfProbeError, ffprobe};
use std::path::Path;

/// Raw probe data for one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    /// `avg_frame_rate` of the first video stream as reported, possibly empty.
    pub raw_frame_rate: String,
    /// `None` when the probe output could not be read.
    pub has_audio: Option<bool>,
}

/// Abstraction over media inspection so the pipeline can run against mocks.
pub trait MediaProber {
    /// Fails only when the inspection tool cannot be invoked at all.
    fn probe(&self, path: &Path) -> CoreResult<ProbeResult>;
}

/// Prober backed by the `ffprobe` crate.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProber;

impl FfprobeProber {
    pub fn new() -> Self {
        Self
    }
}

impl MediaProber for FfprobeProber {
    fn probe(&self, path: &Path) -> CoreResult<ProbeResult> {
        log::debug!("Running ffprobe (via crate) on: {}", path.display());
        match ffprobe(path) {
            Ok(metadata) => Ok(probe_result_from(&metadata)),
            Err(FfProbeError::Io(io_err)) => Err(CoreError::Probe {
                path: path.to_path_buf(),
                message: format!("could not run ffprobe: {io_err}"),
            }),
            Err(FfProbeError::Status(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                log::warn!(
                    "ffprobe reported an error for {} ({}): {}; using defaults",
                    path.display(),
                    output.status,
                    stderr.trim()
                );
                Ok(ProbeResult::default())
            }
            Err(FfProbeError::Deserialize(err)) => {
                log::warn!(
                    "Unreadable ffprobe output for {}: {err}; using defaults",
                    path.display()
                );
                Ok(ProbeResult::default())
            }
            Err(err) => {
                log::warn!(
                    "Unexpected ffprobe error for {}: {err:?}; using defaults",
                    path.display()
                );
                Ok(ProbeResult::default())
            }
        }
    }
}

fn probe_result_from(metadata: &FfProbe) -> ProbeResult {
    let raw_frame_rate = metadata
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .map(|s| s.avg_frame_rate.clone())
        .unwrap_or_default();

    let has_audio = metadata
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    ProbeResult {
        raw_frame_rate,
        has_audio: Some(has_audio),
    }
}
