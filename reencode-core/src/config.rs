//! Configuration structures and constants for the reencode-core library.
//!
//! Everything that shapes the encoder invocation is a named constant here so
//! two runs over the same tree always produce the same command lines.

use crate::error::CoreError;
use std::path::PathBuf;

// Default constants

/// Default input root when none is given.
pub const DEFAULT_INPUT_DIR: &str = ".";

/// Default output root, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "reencoded";

/// Default spacing between forced keyframes, in seconds.
pub const DEFAULT_KEYFRAME_INTERVAL_SECS: f64 = 2.0;

/// Frame rate used when the probed value is missing or unusable.
pub const FALLBACK_FRAME_RATE: f64 = 24.0;

/// Upper bound on keyframe spacing in frames.
/// Guards against absurd GOP values from pathological frame rates or intervals.
pub const MAX_GOP_SIZE: u16 = 300;

/// Container extension used for every output file.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Name of the run-scoped engine log, created under the output root.
pub const RUN_LOG_FILENAME: &str = "reencode.log";

/// Suffix appended to the output file name while ffmpeg is writing it.
pub const PARTIAL_SUFFIX: &str = "partial";

/// Default number of concurrent encodes. 1 keeps discovery order.
pub const DEFAULT_JOBS: usize = 1;

/// H.264 encoder.
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";

/// CRF 18 is visually near-transparent for x264.
pub const DEFAULT_CRF: u8 = 18;

/// x264 speed preset.
pub const DEFAULT_PRESET: &str = "slow";

/// 8-bit 4:2:0 output regardless of source depth or chroma.
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

pub const DEFAULT_PROFILE: &str = "high";

pub const DEFAULT_LEVEL: &str = "4.1";

pub const DEFAULT_AUDIO_CODEC: &str = "aac";

pub const DEFAULT_AUDIO_BITRATE: &str = "192k";

pub const DEFAULT_AUDIO_CHANNELS: u8 = 2;

pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 48_000;

/// Fixed encoder settings applied to every job.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub video_codec: String,
    pub crf: u8,
    pub preset: String,
    pub pixel_format: String,
    pub profile: String,
    pub level: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub audio_channels: u8,
    pub audio_sample_rate: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            crf: DEFAULT_CRF,
            preset: DEFAULT_PRESET.to_string(),
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            level: DEFAULT_LEVEL.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            audio_channels: DEFAULT_AUDIO_CHANNELS,
            audio_sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
        }
    }
}

/// Main configuration for a re-encoding run.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Root of the tree to scan for source files.
    pub input_dir: PathBuf,

    /// Root of the mirrored output tree. Also holds the run log.
    pub output_dir: PathBuf,

    /// Directory for diagnostic log files.
    pub log_dir: PathBuf,

    /// Requested spacing between keyframes in seconds. Must be positive.
    pub keyframe_interval_secs: f64,

    /// Number of concurrent encodes. 0 means one per logical CPU.
    pub jobs: usize,

    pub encoder: EncoderSettings,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let output_dir = PathBuf::from(DEFAULT_OUTPUT_DIR);
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            log_dir: output_dir.join("logs"),
            output_dir,
            keyframe_interval_secs: DEFAULT_KEYFRAME_INTERVAL_SECS,
            jobs: DEFAULT_JOBS,
            encoder: EncoderSettings::default(),
        }
    }
}

impl CoreConfig {
    /// Creates config with required paths. Other fields use defaults.
    pub fn new(input_dir: PathBuf, output_dir: PathBuf, log_dir: PathBuf) -> Self {
        Self {
            input_dir,
            output_dir,
            log_dir,
            ..Default::default()
        }
    }

    /// Path of the run log for this configuration.
    pub fn run_log_path(&self) -> PathBuf {
        self.output_dir.join(RUN_LOG_FILENAME)
    }

    /// Number of worker threads actually used for a run.
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get().max(1)
        } else {
            self.jobs
        }
    }

    /// Validates the keyframe interval and encoder quality.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.keyframe_interval_secs.is_finite() || self.keyframe_interval_secs <= 0.0 {
            return Err(CoreError::Config(format!(
                "keyframe_interval_secs must be a positive number, got {}",
                self.keyframe_interval_secs
            )));
        }

        if self.encoder.crf > 51 {
            return Err(CoreError::Config(format!(
                "crf must be 0-51, got {}",
                self.encoder.crf
            )));
        }

        if self.encoder.audio_channels == 0 {
            return Err(CoreError::Config(
                "audio_channels must be at least 1".to_string(),
            ));
        }

        if self.input_dir.as_os_str().is_empty() || self.output_dir.as_os_str().is_empty() {
            return Err(CoreError::Config(
                "input and output directories must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
