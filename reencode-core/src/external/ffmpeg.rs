//! FFmpeg command building and execution for one encode job.
//!
//! The command is fully determined by the job and the fixed encoder
//! settings. Keyframes are pinned twice: by a forced-keyframe expression at
//! every interval and by an equal GOP/minimum-keyint pair with scene-cut
//! detection disabled.
//!
//! ffmpeg writes to `<output>.partial`. Only a zero exit renames it into
//! place; every other path removes both the partial and the final file so a
//! later run never sees a truncated output as up to date.

use crate::cancel::CancellationFlag;
use crate::config::{EncoderSettings, OUTPUT_EXTENSION, PARTIAL_SUFFIX};
use crate::error::CoreError;
use crate::external::ffmpeg_executor::{EncodeProcess, EncodeSpawner};
use crate::processing::params::{EncodeParameters, GopSize};
use crate::run_log::RunLog;
use crate::summary::{FailReason, Outcome};

use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Whether the output carries an audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMode {
    Present,
    Absent,
    /// The probe could not tell; the first audio stream is mapped if it exists.
    Unknown,
}

impl AudioMode {
    pub fn from_probe(has_audio: Option<bool>) -> Self {
        match has_audio {
            Some(true) => AudioMode::Present,
            Some(false) => AudioMode::Absent,
            None => AudioMode::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AudioMode::Present => "present",
            AudioMode::Absent => "absent",
            AudioMode::Unknown => "unknown",
        }
    }
}

/// Everything needed to encode one file.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub frame_rate: f64,
    pub gop_size: GopSize,
    pub audio: AudioMode,
    pub keyframe_interval_secs: f64,
}

impl EncodeJob {
    pub fn new(
        source: PathBuf,
        output: PathBuf,
        params: EncodeParameters,
        has_audio: Option<bool>,
        keyframe_interval_secs: f64,
    ) -> Self {
        Self {
            source,
            output,
            frame_rate: params.frame_rate,
            gop_size: params.gop_size,
            audio: AudioMode::from_probe(has_audio),
            keyframe_interval_secs,
        }
    }

    /// Temporary path ffmpeg writes to, next to the final output.
    pub fn partial_output(&self) -> PathBuf {
        partial_path(&self.output)
    }
}

/// `clip.mp4` -> `clip.mp4.partial`.
pub fn partial_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from(OUTPUT_EXTENSION));
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    output.with_file_name(name)
}

/// Builds the ffmpeg command for `job`, writing to `destination`.
pub fn build_encode_command(job: &EncodeJob, settings: &EncoderSettings, destination: &Path) -> FfmpegCommand {
    // Shortest round-trip form, so -r and the keyframe grid match the derived GOP.
    let frame_rate = job.frame_rate.to_string();
    let gop = job.gop_size.to_string();
    let interval = job.keyframe_interval_secs.to_string();

    let mut cmd = FfmpegCommand::new();
    cmd.args(["-y", "-nostdin", "-hide_banner"]);
    cmd.input(job.source.to_string_lossy().as_ref());

    cmd.args(["-map", "0:v:0"]);
    if job.audio != AudioMode::Absent {
        // Trailing '?' tolerates a missing stream.
        cmd.args(["-map", "0:a:0?"]);
    }

    cmd.args(["-c:v", &settings.video_codec]);
    cmd.args(["-crf", &settings.crf.to_string()]);
    cmd.args(["-preset", &settings.preset]);
    cmd.args(["-pix_fmt", &settings.pixel_format]);
    cmd.args(["-profile:v", &settings.profile]);
    cmd.args(["-level:v", &settings.level]);
    cmd.args(["-movflags", "+faststart"]);

    cmd.args(["-fps_mode", "cfr"]);
    cmd.args(["-r", &frame_rate]);
    cmd.args(["-g", &gop]);
    cmd.args(["-keyint_min", &gop]);
    cmd.args(["-sc_threshold", "0"]);
    cmd.args(["-force_key_frames", &format!("expr:gte(t,n_forced*{interval})")]);

    match job.audio {
        AudioMode::Present | AudioMode::Unknown => {
            cmd.args(["-c:a", &settings.audio_codec]);
            cmd.args(["-b:a", &settings.audio_bitrate]);
            cmd.args(["-ac", &settings.audio_channels.to_string()]);
            cmd.args(["-ar", &settings.audio_sample_rate.to_string()]);
        }
        AudioMode::Absent => {
            cmd.arg("-an");
        }
    }

    cmd.args(["-f", OUTPUT_EXTENSION]);
    cmd.output(destination.to_string_lossy().as_ref());
    cmd
}

/// Runs one encode and classifies the result.
///
/// The engine's log lines are buffered and written to `run_log` as one
/// record once the process has exited.
pub fn invoke_encode<S: EncodeSpawner>(
    job: &EncodeJob,
    settings: &EncoderSettings,
    spawner: &S,
    run_log: &RunLog,
    cancel: &CancellationFlag,
) -> Outcome {
    let partial = job.partial_output();
    cleanup_partial_output(&partial);

    let mut cmd = build_encode_command(job, settings, &partial);
    let command_line = format_command_line(&mut cmd);
    log::debug!("Running ffmpeg: {command_line}");

    let header = format!("{} -> {}", job.source.display(), job.output.display());
    let mut transcript = format!("$ {command_line}\n");

    let mut process = match spawner.spawn(cmd) {
        Ok(process) => process,
        Err(err) => {
            log::error!("Could not start ffmpeg for {}: {err}", job.source.display());
            transcript.push_str(&format!("failed to start: {err}\n"));
            append_transcript(run_log, &header, &transcript);
            discard_outputs(job);
            return Outcome::Fail(FailReason::Invocation(err.to_string()));
        }
    };

    let events = process.handle_events(|event| {
        match event {
            FfmpegEvent::Log(_level, line) => {
                transcript.push_str(&line);
                transcript.push('\n');
            }
            FfmpegEvent::Error(line) => {
                transcript.push_str("ERROR: ");
                transcript.push_str(&line);
                transcript.push('\n');
            }
            _ => {}
        }
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        Ok(())
    });

    let interrupted = match events {
        Ok(()) => false,
        Err(CoreError::Cancelled) => true,
        Err(err) => {
            log::error!("Lost ffmpeg output for {}: {err}", job.source.display());
            transcript.push_str(&format!("event stream error: {err}\n"));
            if let Err(kill_err) = process.kill() {
                log::warn!("Failed to kill ffmpeg: {kill_err}");
            }
            let _ = process.wait();
            append_transcript(run_log, &header, &transcript);
            discard_outputs(job);
            return Outcome::Fail(FailReason::Invocation(err.to_string()));
        }
    };

    if interrupted {
        log::warn!("Interrupted while encoding {}", job.source.display());
        if let Err(err) = process.kill() {
            log::warn!("Failed to kill ffmpeg: {err}");
        }
        let status = process.wait();
        transcript.push_str(&format!("cancelled; ffmpeg terminated ({})\n", describe_status(&status)));
        append_transcript(run_log, &header, &transcript);
        discard_outputs(job);
        return Outcome::Fail(FailReason::Cancelled);
    }

    let status = match process.wait() {
        Ok(status) => status,
        Err(err) => {
            transcript.push_str(&format!("wait failed: {err}\n"));
            append_transcript(run_log, &header, &transcript);
            discard_outputs(job);
            return Outcome::Fail(FailReason::Invocation(err.to_string()));
        }
    };

    transcript.push_str(&format!("exit: {status}\n"));
    append_transcript(run_log, &header, &transcript);

    if !status.success() {
        log::error!("ffmpeg failed for {} ({status})", job.source.display());
        discard_outputs(job);
        return Outcome::Fail(FailReason::Invocation(format!("ffmpeg exited with {status}")));
    }

    if let Err(err) = fs::rename(&partial, &job.output) {
        log::error!(
            "Could not move {} into place: {err}",
            partial.display()
        );
        discard_outputs(job);
        return Outcome::Fail(FailReason::Invocation(format!(
            "could not finalize output: {err}"
        )));
    }

    log::info!("Encoded {} -> {}", job.source.display(), job.output.display());
    Outcome::Ok
}

fn describe_status(status: &Result<std::process::ExitStatus, CoreError>) -> String {
    match status {
        Ok(status) => status.to_string(),
        Err(err) => err.to_string(),
    }
}

fn append_transcript(run_log: &RunLog, header: &str, transcript: &str) {
    if let Err(err) = run_log.append_record(header, transcript) {
        log::warn!("Failed to write run log {}: {err}", run_log.path().display());
    }
}

fn discard_outputs(job: &EncodeJob) {
    cleanup_partial_output(&job.partial_output());
    cleanup_partial_output(&job.output);
}

/// Removes a file left by an unsuccessful encode. Missing files are fine.
pub fn cleanup_partial_output(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {
            log::warn!("Removed incomplete output: {}", path.display());
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            log::warn!(
                "Failed to remove incomplete output at {}: {}",
                path.display(),
                err
            );
        }
    }
}

/// Renders the program and arguments for the run log.
pub fn format_command_line(cmd: &mut FfmpegCommand) -> String {
    let program = cmd.as_inner().get_program().to_string_lossy().into_owned();
    std::iter::once(program)
        .chain(cmd.get_args().map(|arg| {
            let arg = arg.to_string_lossy();
            if arg.contains(' ') {
                format!("'{arg}'")
            } else {
                arg.into_owned()
            }
        }))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::params::derive_parameters;

    fn job(raw_rate: &str, has_audio: Option<bool>) -> EncodeJob {
        EncodeJob::new(
            PathBuf::from("/in/clip.mov"),
            PathBuf::from("/out/clip.mp4"),
            derive_parameters(raw_rate, 2.0),
            has_audio,
            2.0,
        )
    }

    fn args_of(job: &EncodeJob) -> Vec<String> {
        let cmd = build_encode_command(job, &EncoderSettings::default(), &job.partial_output());
        cmd.get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    fn value_after(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1).cloned())
    }

    #[test]
    fn command_pins_keyframes_and_frame_rate() {
        let args = args_of(&job("30/1", Some(true)));

        assert_eq!(value_after(&args, "-r").as_deref(), Some("30"));
        assert_eq!(value_after(&args, "-g").as_deref(), Some("60"));
        assert_eq!(value_after(&args, "-keyint_min").as_deref(), Some("60"));
        assert_eq!(value_after(&args, "-sc_threshold").as_deref(), Some("0"));
        assert_eq!(value_after(&args, "-fps_mode").as_deref(), Some("cfr"));
        assert_eq!(
            value_after(&args, "-force_key_frames").as_deref(),
            Some("expr:gte(t,n_forced*2)")
        );
    }

    #[test]
    fn command_uses_fixed_encoder_settings() {
        let args = args_of(&job("25", Some(false)));

        assert!(args.iter().any(|a| a == "-y"));
        assert!(args.iter().any(|a| a == "-nostdin"));
        assert_eq!(value_after(&args, "-c:v").as_deref(), Some("libx264"));
        assert_eq!(value_after(&args, "-crf").as_deref(), Some("18"));
        assert_eq!(value_after(&args, "-preset").as_deref(), Some("slow"));
        assert_eq!(value_after(&args, "-pix_fmt").as_deref(), Some("yuv420p"));
        assert_eq!(value_after(&args, "-profile:v").as_deref(), Some("high"));
        assert_eq!(value_after(&args, "-level:v").as_deref(), Some("4.1"));
        assert_eq!(value_after(&args, "-movflags").as_deref(), Some("+faststart"));
        assert_eq!(value_after(&args, "-f").as_deref(), Some("mp4"));
    }

    #[test]
    fn audio_present_maps_optional_stream() {
        let args = args_of(&job("30/1", Some(true)));

        let maps: Vec<_> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-map")
            .filter_map(|(i, _)| args.get(i + 1).cloned())
            .collect();
        assert_eq!(maps, vec!["0:v:0".to_string(), "0:a:0?".to_string()]);
        assert_eq!(value_after(&args, "-c:a").as_deref(), Some("aac"));
        assert_eq!(value_after(&args, "-b:a").as_deref(), Some("192k"));
        assert_eq!(value_after(&args, "-ac").as_deref(), Some("2"));
        assert_eq!(value_after(&args, "-ar").as_deref(), Some("48000"));
        assert!(!args.iter().any(|a| a == "-an"));
    }

    #[test]
    fn audio_absent_excludes_audio() {
        let args = args_of(&job("", Some(false)));

        assert!(args.iter().any(|a| a == "-an"));
        assert!(!args.iter().any(|a| a.starts_with("0:a")));
        assert!(!args.iter().any(|a| a == "-c:a"));
        assert_eq!(value_after(&args, "-r").as_deref(), Some("24"));
        assert_eq!(value_after(&args, "-g").as_deref(), Some("48"));
    }

    #[test]
    fn unknown_audio_maps_optional_stream() {
        let args = args_of(&job("25/1", None));

        assert!(args.iter().any(|a| a == "0:a:0?"));
        assert_eq!(value_after(&args, "-c:a").as_deref(), Some("aac"));
        assert!(!args.iter().any(|a| a == "-an"));
    }

    #[test]
    fn ntsc_rate_and_fractional_interval_keep_full_precision() {
        let job = EncodeJob::new(
            PathBuf::from("/in/clip.mov"),
            PathBuf::from("/out/clip.mp4"),
            derive_parameters("30000/1001", 1.0 / 3.0),
            Some(true),
            1.0 / 3.0,
        );
        let args = args_of(&job);

        let rate: f64 = value_after(&args, "-r").unwrap().parse().unwrap();
        assert_eq!(rate, 30000.0 / 1001.0);
        assert_eq!(value_after(&args, "-g").as_deref(), Some("10"));
        let expr = value_after(&args, "-force_key_frames").unwrap();
        let interval: f64 = expr
            .trim_start_matches("expr:gte(t,n_forced*")
            .trim_end_matches(')')
            .parse()
            .unwrap();
        assert_eq!(interval, 1.0 / 3.0);
    }

    #[test]
    fn command_line_renders_program_and_quotes_spaces() {
        let mut cmd = FfmpegCommand::new_with_path("ffmpeg");
        cmd.input("/in/my clip.mov");
        let line = format_command_line(&mut cmd);
        assert!(line.starts_with("ffmpeg "), "{line}");
        assert!(line.contains("'/in/my clip.mov'"), "{line}");
    }

    #[test]
    fn command_writes_to_partial_path() {
        let job = job("30/1", Some(true));
        let args = args_of(&job);
        assert_eq!(args.last().map(String::as_str), Some("/out/clip.mp4.partial"));
        assert_eq!(value_after(&args, "-i").as_deref(), Some("/in/clip.mov"));
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("out/a/b.mp4")),
            PathBuf::from("out/a/b.mp4.partial")
        );
    }

    #[test]
    fn cleanup_ignores_missing_files() {
        cleanup_partial_output(Path::new("/definitely/not/here.mp4.partial"));
    }
}
