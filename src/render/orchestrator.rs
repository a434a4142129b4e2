use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use rayon::prelude::*;

use crate::{
    foundation::{
        core::FrameFailure,
        error::{ReelError, ReelResult},
        options::{FailurePolicy, FrameThreading, ReelOptions},
    },
    frame::{
        plan::{Frame, FramePlan},
        template::CommandTemplate,
    },
    render::launcher::{FrameLauncher, Invocation},
};

/// Knobs for [`FrameOrchestrator::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestratorOpts {
    /// Passed to the renderer as `-t<threads>`.
    pub renderer_threads: u32,
    pub failure_policy: FailurePolicy,
    /// Per-invocation limit; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Extra attempts per frame after a failed one.
    pub retries: u32,
    pub threading: FrameThreading,
}

impl Default for OrchestratorOpts {
    fn default() -> Self {
        Self {
            renderer_threads: 12,
            failure_policy: FailurePolicy::FailFast,
            timeout: None,
            retries: 0,
            threading: FrameThreading::default(),
        }
    }
}

impl From<&ReelOptions> for OrchestratorOpts {
    fn from(opts: &ReelOptions) -> Self {
        Self {
            renderer_threads: opts.renderer_threads,
            failure_policy: opts.failure_policy,
            timeout: opts.timeout(),
            retries: opts.retries,
            threading: opts.threading.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames_total: u64,
    pub frames_rendered: u64,
    pub frames_failed: u64,
    /// Frames never launched because a fail-fast run stopped early.
    pub frames_skipped: u64,
    /// Attempts beyond the first, summed over all frames.
    pub retries: u64,
}

enum FrameResult {
    Rendered { attempts: u32 },
    Failed(FrameFailure),
}

/// Issues one renderer invocation per frame of a [`FramePlan`].
#[derive(Clone, Debug)]
pub struct FrameOrchestrator {
    binary: PathBuf,
    template: CommandTemplate,
    plan: FramePlan,
    opts: OrchestratorOpts,
}

impl FrameOrchestrator {
    pub fn new(
        binary: impl Into<PathBuf>,
        template: CommandTemplate,
        plan: FramePlan,
        opts: OrchestratorOpts,
    ) -> Self {
        Self {
            binary: binary.into(),
            template,
            plan,
            opts,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn plan(&self) -> &FramePlan {
        &self.plan
    }

    pub fn invocation(&self, frame: &Frame) -> Invocation {
        Invocation {
            program: self.binary.clone(),
            args: frame.render_args(self.opts.renderer_threads, &self.template),
        }
    }

    /// Render every frame of the plan.
    ///
    /// Sequential mode launches frames strictly in reel order, each after the previous process
    /// exited. Parallel mode renders on a worker pool and returns once every launched frame has
    /// finished. A launcher error (for example a spawn failure) aborts the run under either
    /// failure policy.
    #[tracing::instrument(
        skip_all,
        fields(read_max = self.plan.config().read_max, frames = self.plan.len())
    )]
    pub fn run(&self, launcher: &dyn FrameLauncher) -> ReelResult<RunStats> {
        if self.opts.threading.parallel {
            self.run_parallel(launcher)
        } else {
            self.run_sequential(launcher)
        }
    }

    fn run_sequential(&self, launcher: &dyn FrameLauncher) -> ReelResult<RunStats> {
        let mut stats = RunStats {
            frames_total: self.plan.len(),
            ..RunStats::default()
        };
        let mut failures = Vec::new();

        for frame in self.plan.frames() {
            match self.render_frame(frame, launcher)? {
                FrameResult::Rendered { attempts } => {
                    stats.frames_rendered += 1;
                    stats.retries += u64::from(attempts - 1);
                }
                FrameResult::Failed(failure) => {
                    stats.frames_failed += 1;
                    stats.retries += u64::from(failure.attempts - 1);
                    if self.opts.failure_policy == FailurePolicy::FailFast {
                        stats.frames_skipped =
                            stats.frames_total - stats.frames_rendered - stats.frames_failed;
                        tracing::error!(?stats, %failure, "aborting reel");
                        return Err(ReelError::RenderFailure(failure));
                    }
                    tracing::warn!(%failure, "frame failed, continuing");
                    failures.push(failure);
                }
            }
        }

        finish(stats, failures)
    }

    fn run_parallel(&self, launcher: &dyn FrameLauncher) -> ReelResult<RunStats> {
        let pool = build_thread_pool(self.opts.threading.threads)?;
        let fail_fast = self.opts.failure_policy == FailurePolicy::FailFast;
        let abort = AtomicBool::new(false);
        let positions: Vec<u64> = (0..self.plan.len()).collect();

        let results = pool.install(|| {
            positions
                .par_iter()
                .map(|&pos| -> ReelResult<Option<FrameResult>> {
                    if fail_fast && abort.load(Ordering::Relaxed) {
                        return Ok(None);
                    }
                    let Some(frame) = self.plan.frame_at(pos) else {
                        return Ok(None);
                    };
                    let result = self.render_frame(frame, launcher);
                    if fail_fast && !matches!(result, Ok(FrameResult::Rendered { .. })) {
                        abort.store(true, Ordering::Relaxed);
                    }
                    result.map(Some)
                })
                .collect::<Vec<_>>()
        });

        let mut stats = RunStats {
            frames_total: self.plan.len(),
            ..RunStats::default()
        };
        let mut failures = Vec::new();
        for result in results {
            match result? {
                Some(FrameResult::Rendered { attempts }) => {
                    stats.frames_rendered += 1;
                    stats.retries += u64::from(attempts - 1);
                }
                Some(FrameResult::Failed(failure)) => {
                    stats.frames_failed += 1;
                    stats.retries += u64::from(failure.attempts - 1);
                    failures.push(failure);
                }
                None => stats.frames_skipped += 1,
            }
        }

        if fail_fast && !failures.is_empty() {
            let mut failures = failures.into_iter();
            let first = failures.next().ok_or_else(|| {
                ReelError::Other(anyhow::anyhow!("internal error: failure list emptied"))
            })?;
            for other in failures {
                tracing::warn!(failure = %other, "additional frame failed before abort");
            }
            tracing::error!(?stats, failure = %first, "aborting reel");
            return Err(ReelError::RenderFailure(first));
        }

        finish(stats, failures)
    }

    fn render_frame(&self, frame: Frame, launcher: &dyn FrameLauncher) -> ReelResult<FrameResult> {
        let invocation = self.invocation(&frame);
        let max_attempts = self.opts.retries.saturating_add(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            tracing::debug!(
                frame = %frame.kind,
                slot = frame.slot,
                attempt,
                cmd = %invocation.command_line(),
                "launching renderer"
            );
            let report = launcher.launch(&invocation, self.opts.timeout)?;
            if report.outcome.is_success() {
                return Ok(FrameResult::Rendered { attempts: attempt });
            }
            if attempt >= max_attempts {
                return Ok(FrameResult::Failed(FrameFailure {
                    kind: frame.kind,
                    slot: frame.slot,
                    out_path: frame.out_path,
                    outcome: report.outcome,
                    attempts: attempt,
                    stderr: report.stderr,
                }));
            }
            tracing::warn!(
                frame = %frame.kind,
                outcome = %report.outcome,
                attempt,
                max_attempts,
                "renderer failed, retrying"
            );
        }
    }
}

fn finish(stats: RunStats, failures: Vec<FrameFailure>) -> ReelResult<RunStats> {
    if failures.is_empty() {
        tracing::info!(?stats, "all frames rendered");
        Ok(stats)
    } else {
        tracing::error!(?stats, "reel finished with failed frames");
        Err(ReelError::RenderFailures(failures))
    }
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ReelError::validation(
            "frame threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| {
        ReelError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}"))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/orchestrator.rs"]
mod tests;
