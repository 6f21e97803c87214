//! Per-file outcomes and their aggregation into a run summary.

use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

/// Why a file failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    /// The source path could not be placed in the output tree.
    PathMapping(String),
    /// ffprobe could not be run.
    Probe(String),
    /// ffmpeg could not be started or exited non-zero.
    Invocation(String),
    /// The run was interrupted while this file was encoding.
    Cancelled,
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::PathMapping(msg) => write!(f, "path mapping: {msg}"),
            FailReason::Probe(msg) => write!(f, "probe: {msg}"),
            FailReason::Invocation(msg) => write!(f, "encode: {msg}"),
            FailReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Terminal result for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Skip,
    Fail(FailReason),
}

impl Outcome {
    /// Short label used in progress lines and JSON events.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Skip => "skip",
            Outcome::Fail(_) => "fail",
        }
    }
}

/// Counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub ok: usize,
    pub skip: usize,
    pub fail: usize,
    /// True when the run was interrupted.
    pub cancelled: bool,
    /// Discovered files that were never started because of the interrupt.
    pub not_started: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} ok={} skip={} fail={}",
            self.total, self.ok, self.skip, self.fail
        )?;
        if self.cancelled {
            write!(f, " (cancelled, {} not started)", self.not_started)?;
        }
        Ok(())
    }
}

/// Thread-safe accumulator of outcomes.
#[derive(Debug, Default)]
pub struct Aggregator {
    summary: Mutex<RunSummary>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: &Outcome) {
        let mut summary = self
            .summary
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        summary.total += 1;
        match outcome {
            Outcome::Ok => summary.ok += 1,
            Outcome::Skip => summary.skip += 1,
            Outcome::Fail(_) => summary.fail += 1,
        }
    }

    /// Produces the final summary. `discovered` is the number of files found.
    pub fn finish(self, discovered: usize, cancelled: bool) -> RunSummary {
        let mut summary = self
            .summary
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        summary.cancelled = cancelled;
        summary.not_started = discovered.saturating_sub(summary.total);
        summary
    }
}
