//! Run orchestration: discovery, per-file pipeline and aggregation.
//!
//! Per file: map the output path, take the output lock, check the skip gate,
//! probe, derive parameters, encode, record. Any per-file error becomes a
//! failed outcome; only an invalid configuration or an unusable input root
//! ends the run early.

use crate::cancel::CancellationFlag;
use crate::config::CoreConfig;
use crate::discovery::discover;
use crate::error::{CoreError, CoreResult};
use crate::external::ffmpeg::{EncodeJob, invoke_encode};
use crate::external::{EncodeSpawner, MediaProber};
use crate::incremental::should_skip;
use crate::path_mapping::map_output_path;
use crate::processing::params::derive_parameters;
use crate::reporting::{FileContext, Reporter, RunStartInfo};
use crate::run_log::RunLog;
use crate::summary::{Aggregator, FailReason, Outcome, RunSummary};

use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex};
use std::time::Instant;

/// Output paths currently being produced. Two jobs that map to the same
/// output (e.g. `a.mov` and `a.mkv`) run one after the other.
#[derive(Default)]
struct OutputLocks {
    held: Mutex<HashSet<PathBuf>>,
    released: Condvar,
}

struct OutputGuard<'a> {
    locks: &'a OutputLocks,
    path: PathBuf,
}

impl OutputLocks {
    fn acquire(&self, path: &Path) -> OutputGuard<'_> {
        let mut held = self
            .held
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        while held.contains(path) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        held.insert(path.to_path_buf());
        OutputGuard {
            locks: self,
            path: path.to_path_buf(),
        }
    }
}

impl Drop for OutputGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .locks
            .held
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        held.remove(&self.path);
        self.locks.released.notify_all();
    }
}

/// Shared, read-only state for every file in a run.
struct RunContext<'a, P, S> {
    config: &'a CoreConfig,
    prober: &'a P,
    spawner: &'a S,
    reporter: &'a dyn Reporter,
    cancel: &'a CancellationFlag,
    run_log: &'a RunLog,
    aggregator: &'a Aggregator,
    locks: &'a OutputLocks,
}

/// Re-encodes every supported file under `config.input_dir` into
/// `config.output_dir` and returns the aggregated counts.
///
/// The run log at `<output_dir>/reencode.log` is truncated at the start.
/// Once `cancel` is raised no further file is started; the in-flight encode
/// is killed and cleaned up, and the summary reports the files left over.
pub fn process_videos<P, S>(
    config: &CoreConfig,
    prober: &P,
    spawner: &S,
    reporter: &dyn Reporter,
    cancel: &CancellationFlag,
) -> CoreResult<RunSummary>
where
    P: MediaProber + Sync,
    S: EncodeSpawner + Sync,
{
    config.validate()?;
    let started = Instant::now();

    let discovery = discover(&config.input_dir, Some(&config.output_dir))?;

    // Outputs written over their own sources would be rediscovered forever.
    if let (Ok(input), Ok(output)) = (
        config.input_dir.canonicalize(),
        config.output_dir.canonicalize(),
    ) {
        if input == output {
            return Err(CoreError::Config(format!(
                "output directory must differ from input directory ({})",
                input.display()
            )));
        }
    }

    fs::create_dir_all(&config.output_dir).map_err(|e| {
        CoreError::OperationFailed(format!(
            "Failed to create output directory {}: {e}",
            config.output_dir.display()
        ))
    })?;
    let run_log = RunLog::create(&config.run_log_path())?;

    let files: Vec<PathBuf> = discovery.iter().collect();
    let total = files.len();
    let jobs = config.effective_jobs();
    info!(
        "Discovered {total} file(s) under {}; output to {} with {jobs} job(s)",
        config.input_dir.display(),
        config.output_dir.display()
    );

    reporter.run_started(&RunStartInfo {
        total_files: total,
        input_dir: config.input_dir.clone(),
        output_dir: config.output_dir.clone(),
        keyframe_interval_secs: config.keyframe_interval_secs,
        jobs,
    });

    let aggregator = Aggregator::new();
    let locks = OutputLocks::default();
    let ctx = RunContext {
        config,
        prober,
        spawner,
        reporter,
        cancel,
        run_log: &run_log,
        aggregator: &aggregator,
        locks: &locks,
    };

    if jobs <= 1 {
        for (i, source) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            run_one(&ctx, i + 1, total, source);
        }
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| CoreError::OperationFailed(format!("Failed to build worker pool: {e}")))?;
        pool.install(|| {
            files.par_iter().enumerate().for_each(|(i, source)| {
                if cancel.is_cancelled() {
                    return;
                }
                run_one(&ctx, i + 1, total, source);
            });
        });
    }

    let summary = aggregator.finish(total, cancel.is_cancelled());
    if let Err(err) = run_log.append_record("summary", &summary.to_string()) {
        warn!("Failed to write summary to run log: {err}");
    }
    info!("Run finished: {summary}");
    reporter.run_complete(&summary, run_log.path(), started.elapsed());
    Ok(summary)
}

fn run_one<P, S>(ctx: &RunContext<'_, P, S>, index: usize, total: usize, source: &Path)
where
    P: MediaProber,
    S: EncodeSpawner,
{
    let context = FileContext {
        index,
        total,
        source: source.to_path_buf(),
    };
    let Some((outcome, output)) = process_file(ctx, &context) else {
        debug!("[{index}/{total}] {}: not started (cancelled)", source.display());
        return;
    };
    match &outcome {
        Outcome::Fail(reason) => warn!("[{index}/{total}] {}: {reason}", source.display()),
        other => debug!("[{index}/{total}] {}: {}", source.display(), other.label()),
    }
    ctx.aggregator.record(&outcome);
    ctx.reporter.file_finished(&context, &outcome, output.as_deref());
}

/// Returns `None` when the run was cancelled before ffmpeg was started for
/// this file; such files count as not started.
fn process_file<P, S>(
    ctx: &RunContext<'_, P, S>,
    context: &FileContext,
) -> Option<(Outcome, Option<PathBuf>)>
where
    P: MediaProber,
    S: EncodeSpawner,
{
    let config = ctx.config;
    let source = context.source.as_path();

    let output = match map_output_path(&config.input_dir, &config.output_dir, source) {
        Ok(output) => output,
        Err(err) => {
            return Some((Outcome::Fail(FailReason::PathMapping(err.to_string())), None));
        }
    };

    let _guard = ctx.locks.acquire(&output);

    if should_skip(&output, source) {
        debug!("Output is newer than source, skipping: {}", output.display());
        return Some((Outcome::Skip, Some(output)));
    }

    let probe = match ctx.prober.probe(source) {
        Ok(probe) => probe,
        Err(err) => {
            return Some((Outcome::Fail(FailReason::Probe(err.to_string())), Some(output)));
        }
    };

    let params = derive_parameters(&probe.raw_frame_rate, config.keyframe_interval_secs);
    if params.frame_rate_fallback {
        let message = format!(
            "{}: frame rate {:?} unusable, assuming {} fps",
            source.display(),
            probe.raw_frame_rate,
            params.frame_rate
        );
        warn!("{message}");
        ctx.reporter.warning(&message);
    }

    let job = EncodeJob::new(
        source.to_path_buf(),
        output.clone(),
        params,
        probe.has_audio,
        config.keyframe_interval_secs,
    );
    info!(
        "Encoding {} -> {} (fps {}, gop {}, audio {})",
        source.display(),
        output.display(),
        job.frame_rate,
        job.gop_size,
        job.audio.as_str()
    );

    if let Some(parent) = output.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            return Some((
                Outcome::Fail(FailReason::Invocation(format!(
                    "cannot create {}: {err}",
                    parent.display()
                ))),
                Some(output),
            ));
        }
    }

    if ctx.cancel.is_cancelled() {
        return None;
    }

    ctx.reporter.encode_started(context, &job);
    let outcome = invoke_encode(&job, &config.encoder, ctx.spawner, ctx.run_log, ctx.cancel);
    Some((outcome, Some(output)))
}
