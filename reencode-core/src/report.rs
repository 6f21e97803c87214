//! Media inspection report.
//!
//! For every supported file under a directory this collects the first video
//! stream's geometry, timing and keyframe spacing, and writes the table as
//! both CSV and TSV. Running it over an output tree shows whether the encoded
//! GOP matches the requested keyframe interval.

use crate::discovery::find_processable_files;
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use crate::processing::params::parse_frame_rate;

use log::{debug, info, warn};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Default file name stem for the report files.
pub const DEFAULT_REPORT_PREFIX: &str = "video_check_report";

/// Report columns, in output order.
pub const REPORT_COLUMNS: [&str; 12] = [
    "File",
    "WxH",
    "FPS",
    "Frames",
    "DurationSeconds",
    "SAR",
    "DAR",
    "StartSeconds",
    "Keyframes",
    "KF_Min_s",
    "KF_Avg_s",
    "KF_Max_s",
];

// ---- ffprobe JSON ----

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    sample_aspect_ratio: Option<String>,
    display_aspect_ratio: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    nb_frames: Option<String>,
    start_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    start_time: Option<String>,
}

/// Video stream properties shown in the report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    pub dimensions: Option<(u32, u32)>,
    pub fps: Option<f64>,
    pub frames: Option<u64>,
    pub duration_secs: Option<f64>,
    pub sample_aspect_ratio: String,
    pub display_aspect_ratio: String,
    pub start_secs: f64,
}

/// Keyframe count and spacing of the first video stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyframeSummary {
    pub count: usize,
    /// Min, average and max distance between consecutive keyframes.
    /// `None` with fewer than two keyframes.
    pub intervals: Option<(f64, f64, f64)>,
}

/// One report line. `None` parts could not be probed and render blank.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub file: String,
    pub stream: Option<StreamSummary>,
    pub keyframes: Option<KeyframeSummary>,
}

/// Where the report was written.
#[derive(Debug, Clone)]
pub struct ReportFiles {
    pub csv: PathBuf,
    pub tsv: PathBuf,
    pub rows: usize,
}

/// Source of raw ffprobe output for the report.
pub trait ReportProber {
    /// `-show_streams -show_format` JSON for the file.
    fn stream_json(&self, path: &Path) -> CoreResult<String>;
    /// One keyframe timestamp per line for the first video stream.
    fn keyframe_timestamps(&self, path: &Path) -> CoreResult<String>;
}

/// Runs the `ffprobe` binary from `PATH`.
#[derive(Debug, Clone, Default)]
pub struct FfprobeCli;

impl FfprobeCli {
    fn run(args: &[&str], path: &Path) -> CoreResult<String> {
        let output = Command::new("ffprobe")
            .args(args)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| command_start_error("ffprobe", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(command_failed_error("ffprobe", output.status, stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ReportProber for FfprobeCli {
    fn stream_json(&self, path: &Path) -> CoreResult<String> {
        Self::run(
            &[
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ],
            path,
        )
    }

    fn keyframe_timestamps(&self, path: &Path) -> CoreResult<String> {
        Self::run(
            &[
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-skip_frame",
                "nokey",
                "-show_entries",
                "frame=best_effort_timestamp_time",
                "-of",
                "default=nw=1:nk=1",
            ],
            path,
        )
    }
}

fn parse_seconds(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Extracts the report fields from ffprobe's JSON output.
///
/// Stream-level duration and start time win over the container's. Frames
/// come from `nb_frames` when present, otherwise from duration times fps.
pub fn summarize_stream_json(json: &str) -> CoreResult<StreamSummary> {
    let parsed: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| CoreError::JsonParseError(format!("ffprobe output: {e}")))?;

    let video = parsed
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .unwrap_or_default();
    let format = parsed.format.unwrap_or_default();

    let fps = non_empty(video.avg_frame_rate.as_ref())
        .and_then(parse_frame_rate)
        .or_else(|| non_empty(video.r_frame_rate.as_ref()).and_then(parse_frame_rate));

    let duration_secs = parse_seconds(
        non_empty(video.duration.as_ref()).or_else(|| non_empty(format.duration.as_ref())),
    )
    .filter(|d| *d > 0.0);

    let frames = match non_empty(video.nb_frames.as_ref()) {
        Some("N/A") | None => match (duration_secs, fps) {
            (Some(duration), Some(fps)) => Some((duration * fps).round() as u64),
            _ => None,
        },
        Some(nb) => nb.trim().parse::<u64>().ok(),
    };

    let start_secs = parse_seconds(
        non_empty(video.start_time.as_ref()).or_else(|| non_empty(format.start_time.as_ref())),
    )
    .unwrap_or(0.0);

    let dimensions = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
        _ => None,
    };

    Ok(StreamSummary {
        dimensions,
        fps,
        frames,
        duration_secs,
        sample_aspect_ratio: video.sample_aspect_ratio.unwrap_or_default(),
        display_aspect_ratio: video.display_aspect_ratio.unwrap_or_default(),
        start_secs,
    })
}

/// Parses one timestamp per line, ignoring blanks and `N/A`.
pub fn parse_keyframe_timestamps(output: &str) -> Vec<f64> {
    output
        .lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .filter(|t| t.is_finite())
        .collect()
}

/// Counts keyframes and measures the gaps between consecutive ones.
pub fn summarize_keyframes(timestamps: &[f64]) -> KeyframeSummary {
    let gaps: Vec<f64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
    let intervals = if gaps.is_empty() {
        None
    } else {
        let min = gaps.iter().copied().fold(f64::INFINITY, f64::min);
        let max = gaps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = gaps.iter().sum::<f64>() / gaps.len() as f64;
        Some((min, avg, max))
    };
    KeyframeSummary {
        count: timestamps.len(),
        intervals,
    }
}

impl ReportRow {
    /// Cell values in `REPORT_COLUMNS` order.
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![self.file.clone()];

        match &self.stream {
            Some(s) => {
                cells.push(s.dimensions.map(|(w, h)| format!("{w}x{h}")).unwrap_or_default());
                cells.push(s.fps.map(|f| format!("{f:.3}")).unwrap_or_default());
                cells.push(s.frames.map(|f| f.to_string()).unwrap_or_default());
                cells.push(s.duration_secs.map(|d| format!("{d:.6}")).unwrap_or_default());
                cells.push(s.sample_aspect_ratio.clone());
                cells.push(s.display_aspect_ratio.clone());
                cells.push(format!("{:.6}", s.start_secs));
            }
            None => cells.extend(std::iter::repeat_n(String::new(), 7)),
        }

        match &self.keyframes {
            Some(k) => {
                cells.push(k.count.to_string());
                match k.intervals {
                    Some((min, avg, max)) => {
                        cells.push(format!("{min:.3}"));
                        cells.push(format!("{avg:.3}"));
                        cells.push(format!("{max:.3}"));
                    }
                    None => cells.extend(std::iter::repeat_n(String::new(), 3)),
                }
            }
            None => cells.extend(std::iter::repeat_n(String::new(), 4)),
        }

        cells
    }
}

/// Probes one file. Probe failures blank the affected columns.
pub fn inspect_file<P: ReportProber>(prober: &P, path: &Path, display: String) -> ReportRow {
    let stream = match prober
        .stream_json(path)
        .and_then(|json| summarize_stream_json(&json))
    {
        Ok(summary) => Some(summary),
        Err(err) => {
            warn!("Could not read stream info for {}: {err}", path.display());
            None
        }
    };

    let keyframes = match prober.keyframe_timestamps(path) {
        Ok(output) => Some(summarize_keyframes(&parse_keyframe_timestamps(&output))),
        Err(err) => {
            warn!("Could not read keyframes for {}: {err}", path.display());
            None
        }
    };

    ReportRow {
        file: display,
        stream,
        keyframes,
    }
}

/// Probes every supported file under `dir`, in discovery order.
pub fn build_report<P: ReportProber>(dir: &Path, prober: &P) -> CoreResult<Vec<ReportRow>> {
    let files = find_processable_files(dir, None)?;
    Ok(files
        .iter()
        .map(|path| {
            let display = path
                .strip_prefix(dir)
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned();
            debug!("Inspecting {display}");
            inspect_file(prober, path, display)
        })
        .collect())
}

/// Field separator for [`write_delimited`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
        }
    }

    fn escape(self, cell: &str) -> String {
        match self {
            Delimiter::Comma => {
                if cell.contains([',', '"', '\n', '\r']) {
                    format!("\"{}\"", cell.replace('"', "\"\""))
                } else {
                    cell.to_string()
                }
            }
            // TSV has no quoting; keep each cell on one line.
            Delimiter::Tab => cell.replace(['\t', '\n', '\r'], " "),
        }
    }
}

/// Writes a header line and one line per row.
pub fn write_delimited<W: Write>(mut writer: W, rows: &[ReportRow], delimiter: Delimiter) -> io::Result<()> {
    let sep = delimiter.as_char().to_string();
    let line_end = match delimiter {
        Delimiter::Comma => "\r\n",
        Delimiter::Tab => "\n",
    };

    write!(writer, "{}{line_end}", REPORT_COLUMNS.join(&sep))?;
    for row in rows {
        let line: Vec<String> = row.cells().iter().map(|c| delimiter.escape(c)).collect();
        write!(writer, "{}{line_end}", line.join(&sep))?;
    }
    writer.flush()
}

fn write_file(path: &Path, rows: &[ReportRow], delimiter: Delimiter) -> CoreResult<()> {
    let file = File::create(path).map_err(|e| {
        CoreError::OperationFailed(format!("Failed to create {}: {e}", path.display()))
    })?;
    write_delimited(BufWriter::new(file), rows, delimiter)?;
    Ok(())
}

/// Inspects `dir` and writes `<prefix>.csv` and `<prefix>.tsv` into `out_dir`.
pub fn write_report<P: ReportProber>(
    dir: &Path,
    out_dir: &Path,
    prefix: &str,
    prober: &P,
) -> CoreResult<ReportFiles> {
    let rows = build_report(dir, prober)?;

    std::fs::create_dir_all(out_dir)?;
    let csv = out_dir.join(format!("{prefix}.csv"));
    let tsv = out_dir.join(format!("{prefix}.tsv"));
    write_file(&csv, &rows, Delimiter::Comma)?;
    write_file(&tsv, &rows, Delimiter::Tab)?;

    info!(
        "Wrote report for {} file(s): {}, {}",
        rows.len(),
        csv.display(),
        tsv.display()
    );
    Ok(ReportFiles {
        csv,
        tsv,
        rows: rows.len(),
    })
}
