//! FFmpeg process management behind a small trait seam.
//!
//! The sidecar implementation detaches ffmpeg from the terminal. Its stdin
//! pipe is closed right after spawning and, on Unix, the child gets its own
//! process group so a terminal Ctrl+C reaches only the orchestrator, which
//! then kills the child itself.

use crate::error::{CoreResult, command_failed_error, command_start_error, command_wait_error};
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::process::ExitStatus;

/// An ffmpeg process that is running or has finished.
pub trait EncodeProcess {
    /// Feeds every event to `handler` until the process closes its output or
    /// the handler returns an error, which is passed through unchanged.
    fn handle_events<F>(&mut self, handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>;

    /// Terminates the process. Already-exited processes are not an error.
    fn kill(&mut self) -> CoreResult<()>;

    /// Waits for the process to exit and returns its status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// Starts ffmpeg processes.
pub trait EncodeSpawner {
    type Process: EncodeProcess;

    /// Spawns the command, consuming it.
    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process>;
}

/// `EncodeProcess` over an `ffmpeg_sidecar` child.
pub struct SidecarProcess(FfmpegChild);

impl EncodeProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let iterator = self.0.iter().map_err(|e| {
            log::error!("Failed to get ffmpeg event iterator: {e}");
            command_failed_error("ffmpeg (get iter)", ExitStatus::default(), e.to_string())
        })?;
        for event in iterator {
            handler(event)?;
        }
        Ok(())
    }

    fn kill(&mut self) -> CoreResult<()> {
        match self.0.kill() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(command_wait_error("ffmpeg (kill)", e)),
        }
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0.wait().map_err(|e| command_wait_error("ffmpeg", e))
    }
}

/// `EncodeSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl EncodeSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        detach_from_terminal(&mut cmd);
        cmd.spawn()
            .map(|mut child| {
                // ffmpeg-sidecar requires a piped stdin; `-nostdin` keeps ffmpeg off it.
                drop(child.take_stdin());
                SidecarProcess(child)
            })
            .map_err(|e| command_start_error("ffmpeg", e))
    }
}

#[cfg(unix)]
fn detach_from_terminal(cmd: &mut FfmpegCommand) {
    use std::os::unix::process::CommandExt;
    cmd.as_inner_mut().process_group(0);
}

#[cfg(not(unix))]
fn detach_from_terminal(_cmd: &mut FfmpegCommand) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use std::error::Error;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    type TestResult = Result<(), Box<dyn Error>>;

    /// Writes an executable shell script standing in for ffmpeg.
    fn stub_ffmpeg(dir: &Path, body: &str) -> Result<PathBuf, Box<dyn Error>> {
        let path = dir.join("ffmpeg");
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    /// Spawns the stub, retrying while another test's fork still holds it open
    /// for writing (ETXTBSY).
    fn spawn_stub(path: &Path) -> CoreResult<SidecarProcess> {
        for _ in 0..20 {
            match SidecarSpawner.spawn(FfmpegCommand::new_with_path(path)) {
                Err(CoreError::CommandStart(_, e)) if e.raw_os_error() == Some(26) => {
                    std::thread::sleep(std::time::Duration::from_millis(25));
                }
                other => return other,
            }
        }
        SidecarSpawner.spawn(FfmpegCommand::new_with_path(path))
    }

    fn log_lines<P: EncodeProcess>(process: &mut P) -> CoreResult<Vec<String>> {
        let mut lines = Vec::new();
        process.handle_events(|event| {
            if let FfmpegEvent::Log(_, line) = event {
                lines.push(line);
            }
            Ok(())
        })?;
        Ok(lines)
    }

    #[test]
    fn sidecar_child_sees_closed_stdin() -> TestResult {
        let dir = tempfile::tempdir()?;
        let ffmpeg = stub_ffmpeg(
            dir.path(),
            "if read -r line; then echo \"stdin: open\" >&2; else echo \"stdin: closed\" >&2; fi\nexit 3",
        )?;

        let mut process = spawn_stub(&ffmpeg)?;
        let lines = log_lines(&mut process)?;
        let status = process.wait()?;

        assert!(lines.iter().any(|l| l.contains("stdin: closed")), "{lines:?}");
        assert_eq!(status.code(), Some(3));
        Ok(())
    }

    #[test]
    fn sidecar_kill_stops_a_running_child() -> TestResult {
        let dir = tempfile::tempdir()?;
        let ffmpeg = stub_ffmpeg(dir.path(), "exec sleep 30")?;

        let mut process = spawn_stub(&ffmpeg)?;
        process.kill()?;
        let status = process.wait()?;
        assert!(!status.success());

        // Killing an already-reaped child is not an error.
        process.kill()?;
        Ok(())
    }

    #[test]
    fn missing_binary_is_a_start_error() {
        let result = SidecarSpawner.spawn(FfmpegCommand::new_with_path("/nonexistent/ffmpeg"));
        assert!(matches!(result, Err(CoreError::CommandStart(..))));
    }
}
