use crate::external::ffmpeg::EncodeJob;
use crate::summary::{Outcome, RunSummary};
use crate::utils::{format_duration, format_frame_rate};

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde_json::json;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Run metadata announced before the first file.
#[derive(Clone, Debug)]
pub struct RunStartInfo {
    pub total_files: usize,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub keyframe_interval_secs: f64,
    pub jobs: usize,
}

/// Position of a file within the run.
#[derive(Clone, Debug)]
pub struct FileContext {
    /// 1-based.
    pub index: usize,
    pub total: usize,
    pub source: PathBuf,
}

/// Reporter interface implemented by both human-readable and JSON reporters.
pub trait Reporter: Send + Sync {
    fn run_started(&self, _info: &RunStartInfo) {}
    fn encode_started(&self, _context: &FileContext, _job: &EncodeJob) {}
    fn file_finished(&self, _context: &FileContext, _outcome: &Outcome, _output: Option<&Path>) {}
    fn warning(&self, _message: &str) {}
    fn run_complete(&self, _summary: &RunSummary, _run_log: &Path, _elapsed: Duration) {}
}

/// No-op reporter that discards all updates.
pub struct NullReporter;

impl Reporter for NullReporter {}

fn describe_job(job: &EncodeJob) -> String {
    format!(
        "fps {}, gop {}, audio {}",
        format_frame_rate(job.frame_rate),
        job.gop_size,
        job.audio.as_str()
    )
}

/// Human-friendly reporter: one spinner per in-flight encode, one line per
/// finished file.
pub struct TerminalReporter {
    multi: MultiProgress,
    active: Mutex<HashMap<usize, (ProgressBar, String)>>,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(HashMap::new()),
        }
    }

    fn println(&self, line: String) {
        if self.multi.println(&line).is_err() {
            println!("{line}");
        }
    }
}

impl Reporter for TerminalReporter {
    fn run_started(&self, info: &RunStartInfo) {
        println!("\n{}", style("REENCODE").bold().cyan());
        println!("  {:<10} {}", style("Input:").bold(), info.input_dir.display());
        println!("  {:<10} {}", style("Output:").bold(), info.output_dir.display());
        println!(
            "  {:<10} {}s",
            style("Keyframes:").bold(),
            format_frame_rate(info.keyframe_interval_secs)
        );
        println!("  {:<10} {}", style("Jobs:").bold(), info.jobs);
        println!("  {:<10} {}", style("Files:").bold(), info.total_files);
        println!();
    }

    fn encode_started(&self, context: &FileContext, job: &EncodeJob) {
        let params = describe_job(job);
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!(
            "[{}/{}] encoding {} ({})",
            context.index,
            context.total,
            context.source.display(),
            params
        ));
        pb.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut active) = self.active.lock() {
            active.insert(context.index, (pb, params));
        }
    }

    fn file_finished(&self, context: &FileContext, outcome: &Outcome, output: Option<&Path>) {
        let entry = self
            .active
            .lock()
            .ok()
            .and_then(|mut active| active.remove(&context.index));
        let params = match entry {
            Some((pb, params)) => {
                pb.finish_and_clear();
                Some(params)
            }
            None => None,
        };

        let label = match outcome {
            Outcome::Ok => style("ok  ").green().bold(),
            Outcome::Skip => style("skip").dim(),
            Outcome::Fail(_) => style("fail").red().bold(),
        };
        let mut line = format!(
            "[{}/{}] {} {}",
            context.index,
            context.total,
            label,
            context.source.display()
        );
        if let Some(output) = output {
            line.push_str(&format!(" -> {}", output.display()));
        }
        if let Some(params) = params {
            line.push_str(&format!(" ({params})"));
        }
        if let Outcome::Fail(reason) = outcome {
            line.push_str(&format!(": {}", style(reason).red()));
        }
        self.println(line);
    }

    fn warning(&self, message: &str) {
        self.println(style(format!("WARN: {message}")).yellow().bold().to_string());
    }

    fn run_complete(&self, summary: &RunSummary, run_log: &Path, elapsed: Duration) {
        println!("\n{}", style("SUMMARY").bold().cyan());
        println!("  {:<8} {}", style("Total:").bold(), summary.total);
        println!("  {:<8} {}", style("Ok:").bold(), style(summary.ok).green());
        println!("  {:<8} {}", style("Skip:").bold(), summary.skip);
        let fail = if summary.fail > 0 {
            style(summary.fail).red().bold()
        } else {
            style(summary.fail)
        };
        println!("  {:<8} {}", style("Fail:").bold(), fail);
        if summary.cancelled {
            println!(
                "  {} {} file(s) not started",
                style("Cancelled:").yellow().bold(),
                summary.not_started
            );
        }
        println!("  {:<8} {}", style("Time:").bold(), format_duration(elapsed));
        println!("  {:<8} {}", style("Log:").bold(), run_log.display());
    }
}

/// Line-delimited JSON reporter for machine consumers.
pub struct JsonReporter {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn write_value(&self, value: serde_json::Value) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", value);
            let _ = writer.flush();
        }
    }
}

impl Reporter for JsonReporter {
    fn run_started(&self, info: &RunStartInfo) {
        self.write_value(json!({
            "type": "run_started",
            "total_files": info.total_files,
            "input_dir": info.input_dir.display().to_string(),
            "output_dir": info.output_dir.display().to_string(),
            "keyframe_interval_secs": info.keyframe_interval_secs,
            "jobs": info.jobs,
            "timestamp": Self::timestamp(),
        }));
    }

    fn encode_started(&self, context: &FileContext, job: &EncodeJob) {
        self.write_value(json!({
            "type": "encode_started",
            "index": context.index,
            "total": context.total,
            "source": context.source.display().to_string(),
            "output": job.output.display().to_string(),
            "frame_rate": job.frame_rate,
            "gop_size": job.gop_size.get(),
            "audio": job.audio.as_str(),
            "timestamp": Self::timestamp(),
        }));
    }

    fn file_finished(&self, context: &FileContext, outcome: &Outcome, output: Option<&Path>) {
        let reason = match outcome {
            Outcome::Fail(reason) => Some(reason.to_string()),
            _ => None,
        };
        self.write_value(json!({
            "type": "file_finished",
            "index": context.index,
            "total": context.total,
            "source": context.source.display().to_string(),
            "output": output.map(|p| p.display().to_string()),
            "outcome": outcome.label(),
            "reason": reason,
            "timestamp": Self::timestamp(),
        }));
    }

    fn warning(&self, message: &str) {
        self.write_value(json!({
            "type": "warning",
            "message": message,
            "timestamp": Self::timestamp(),
        }));
    }

    fn run_complete(&self, summary: &RunSummary, run_log: &Path, elapsed: Duration) {
        self.write_value(json!({
            "type": "run_complete",
            "summary": summary,
            "run_log": run_log.display().to_string(),
            "duration_seconds": elapsed.as_secs(),
            "timestamp": Self::timestamp(),
        }));
    }
}
