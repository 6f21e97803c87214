// reencode-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

use super::ffmpeg_executor::{EncodeProcess, EncodeSpawner};
use super::ffprobe_executor::{MediaProber, ProbeResult};
use crate::cancel::CancellationFlag;
use crate::error::{CoreError, CoreResult};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt; // For ExitStatus::from_raw
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

/// What a mocked ffmpeg run does.
#[derive(Clone, Debug)]
pub enum MockEncodeBehavior {
    /// Writes the output file and exits 0.
    Succeed,
    /// Writes part of the output file, then exits with the given code.
    FailAfterPartialWrite(i32),
    /// Spawning itself fails.
    SpawnError,
    /// Writes part of the output, then raises the flag mid-encode.
    InterruptDuringEncode(CancellationFlag),
}

/// Mock implementation of EncodeProcess.
pub struct MockEncodeProcess {
    events: Vec<FfmpegEvent>,
    exit_status: ExitStatus,
    interrupt: Option<CancellationFlag>,
    killed: Arc<Mutex<usize>>,
    was_killed: bool,
}

impl EncodeProcess for MockEncodeProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        for (i, event) in std::mem::take(&mut self.events).into_iter().enumerate() {
            if i == 1 {
                if let Some(flag) = &self.interrupt {
                    flag.cancel();
                }
            }
            handler(event)?;
        }
        Ok(())
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.was_killed = true;
        *self.killed.lock().unwrap() += 1;
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        if self.was_killed {
            // SIGKILL
            Ok(ExitStatus::from_raw(9))
        } else {
            Ok(self.exit_status)
        }
    }
}

/// Mock implementation of EncodeSpawner.
///
/// Rules match on any argument containing the pattern (usually a source
/// file name). Unmatched commands succeed.
#[derive(Clone, Default)]
pub struct MockEncodeSpawner {
    rules: Arc<Mutex<Vec<(String, MockEncodeBehavior)>>>,
    received_calls: Arc<Mutex<Vec<Vec<String>>>>,
    killed: Arc<Mutex<usize>>,
}

impl MockEncodeSpawner {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_behavior(&self, arg_pattern: &str, behavior: MockEncodeBehavior) {
        self.rules
            .lock()
            .unwrap()
            .push((arg_pattern.to_string(), behavior));
    }

    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls.lock().unwrap().clone()
    }

    /// The recorded call whose input argument contains `pattern`.
    pub fn call_for(&self, pattern: &str) -> Option<Vec<String>> {
        self.get_received_calls().into_iter().find(|args| {
            args.iter()
                .position(|a| a == "-i")
                .and_then(|i| args.get(i + 1))
                .is_some_and(|input| input.contains(pattern))
        })
    }

    pub fn kill_count(&self) -> usize {
        *self.killed.lock().unwrap()
    }

    fn log_events() -> Vec<FfmpegEvent> {
        vec![
            FfmpegEvent::Log(LogLevel::Info, "Input #0, mock".to_string()),
            FfmpegEvent::Log(LogLevel::Info, "Stream mapping: mock".to_string()),
            FfmpegEvent::Log(LogLevel::Info, "frame=  100 fps=50".to_string()),
        ]
    }
}

fn write_output(args: &[String], contents: &[u8]) {
    let Some(output) = args.last() else {
        log::warn!("MockEncodeSpawner couldn't find output path in args.");
        return;
    };
    let output = PathBuf::from(output);
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&output, contents).unwrap();
}

impl EncodeSpawner for MockEncodeSpawner {
    type Process = MockEncodeProcess;

    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        let args: Vec<String> = cmd
            .get_args()
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        self.received_calls.lock().unwrap().push(args.clone());

        let behavior = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| args.iter().any(|arg| arg.contains(pattern.as_str())))
            .map(|(_, behavior)| behavior.clone())
            .unwrap_or(MockEncodeBehavior::Succeed);

        let mut process = MockEncodeProcess {
            events: Self::log_events(),
            exit_status: ExitStatus::from_raw(0),
            interrupt: None,
            killed: Arc::clone(&self.killed),
            was_killed: false,
        };

        match behavior {
            MockEncodeBehavior::Succeed => {
                write_output(&args, b"mock encoded output");
            }
            MockEncodeBehavior::FailAfterPartialWrite(code) => {
                write_output(&args, b"trunc");
                // Raw wait status: exit code lives in the high byte.
                process.exit_status = ExitStatus::from_raw(code << 8);
                process
                    .events
                    .push(FfmpegEvent::Error("Conversion failed!".to_string()));
            }
            MockEncodeBehavior::SpawnError => {
                return Err(CoreError::CommandStart(
                    "ffmpeg".to_string(),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "mock: ffmpeg not found"),
                ));
            }
            MockEncodeBehavior::InterruptDuringEncode(flag) => {
                write_output(&args, b"half");
                process.interrupt = Some(flag);
            }
        }
        Ok(process)
    }
}

/// Mock implementation of MediaProber keyed by file name.
#[derive(Clone, Default)]
pub struct MockProber {
    results: Arc<Mutex<HashMap<String, ProbeResult>>>,
    failures: Arc<Mutex<Vec<String>>>,
    cancel_on: Arc<Mutex<Vec<(String, CancellationFlag)>>>,
    probed: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockProber {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn expect(&self, file_name: &str, raw_frame_rate: &str, has_audio: bool) {
        self.results.lock().unwrap().insert(
            file_name.to_string(),
            ProbeResult {
                raw_frame_rate: raw_frame_rate.to_string(),
                has_audio: Some(has_audio),
            },
        );
    }

    /// Answers for `file_name` as if ffprobe's output could not be read.
    pub fn expect_unreadable(&self, file_name: &str) {
        self.results
            .lock()
            .unwrap()
            .insert(file_name.to_string(), ProbeResult::default());
    }

    /// Raises `flag` while `file_name` is being probed.
    pub fn cancel_when_probing(&self, file_name: &str, flag: CancellationFlag) {
        self.cancel_on
            .lock()
            .unwrap()
            .push((file_name.to_string(), flag));
    }

    /// Makes probing `file_name` fail as if ffprobe could not be launched.
    pub fn fail_for(&self, file_name: &str) {
        self.failures.lock().unwrap().push(file_name.to_string());
    }

    pub fn probed(&self) -> Vec<PathBuf> {
        self.probed.lock().unwrap().clone()
    }
}

impl MediaProber for MockProber {
    fn probe(&self, path: &Path) -> CoreResult<ProbeResult> {
        self.probed.lock().unwrap().push(path.to_path_buf());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for (pattern, flag) in self.cancel_on.lock().unwrap().iter() {
            if *pattern == name {
                flag.cancel();
            }
        }

        if self.failures.lock().unwrap().contains(&name) {
            return Err(CoreError::Probe {
                path: path.to_path_buf(),
                message: "mock: ffprobe not found".to_string(),
            });
        }

        Ok(self
            .results
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .unwrap_or_default())
    }
}
