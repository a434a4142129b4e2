use std::path::{Path, PathBuf};

use crate::{
    binary::resolver::BinaryResolver,
    foundation::{
        error::{ReelError, ReelResult},
        options::{ReelOptions, StalePolicy},
    },
    frame::{plan::FramePlan, template::CommandTemplate},
    metadata::writer::MetadataWriter,
    render::{
        launcher::FrameLauncher,
        orchestrator::{FrameOrchestrator, OrchestratorOpts, RunStats},
    },
};

/// Summary of a successful [`render_reel`] run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReelReport {
    pub binary: PathBuf,
    pub metadata_path: PathBuf,
    /// Frame files in reel order.
    pub frames: Vec<PathBuf>,
    /// Stale frames deleted before rendering.
    pub purged: Vec<PathBuf>,
    pub stats: RunStats,
}

/// Produce a full reel: resolve the renderer, write the metadata record, render every frame and
/// check that every frame file exists.
///
/// Steps, in order:
/// 1. validate options and the command template
/// 2. [`BinaryResolver::resolve`] (nothing has touched the filesystem if this fails)
/// 3. apply the [`StalePolicy`] to the output directory
/// 4. [`MetadataWriter::write`]
/// 5. [`FrameOrchestrator::run`]
/// 6. [`verify_frame_set`]
///
/// Frames rendered before a failure are left on disk.
#[tracing::instrument(
    skip_all,
    fields(read_max = opts.read_max, out_dir = %opts.out_dir.display())
)]
pub fn render_reel(opts: &ReelOptions, launcher: &dyn FrameLauncher) -> ReelResult<ReelReport> {
    opts.validate()?;
    let template = CommandTemplate::from_args(opts.template.iter().cloned())?;

    let binary = BinaryResolver::new(opts.renderer_candidates()).resolve()?;
    tracing::info!(binary = %binary.display(), "using renderer");

    prepare_out_dir(&opts.out_dir, opts.create_dirs)?;
    let plan = FramePlan::new(opts.reel_config(), &opts.out_dir);

    let purged = match opts.stale_policy {
        StalePolicy::Purge => purge_stale_frames(&plan)?,
        StalePolicy::Keep => {
            let stale = plan.stale_outputs()?;
            if !stale.is_empty() {
                tracing::warn!(
                    count = stale.len(),
                    "frames from a previous, larger reel left in place"
                );
            }
            Vec::new()
        }
    };

    let metadata_path = opts.metadata_path();
    MetadataWriter::new(&metadata_path)
        .create_dirs(opts.create_dirs)
        .write(&opts.reel_config())?;

    let orchestrator =
        FrameOrchestrator::new(binary.clone(), template, plan, OrchestratorOpts::from(opts));
    let stats = orchestrator.run(launcher)?;
    verify_frame_set(orchestrator.plan())?;

    Ok(ReelReport {
        binary,
        metadata_path,
        frames: orchestrator.plan().expected_paths(),
        purged,
        stats,
    })
}

/// Fail with [`ReelError::IncompleteFrameSet`] unless every frame file of `plan` exists.
pub fn verify_frame_set(plan: &FramePlan) -> ReelResult<()> {
    let missing = plan.missing_outputs();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ReelError::IncompleteFrameSet { missing })
}

/// Delete numbered frames above the plan's coverage slot; returns the deleted paths.
pub fn purge_stale_frames(plan: &FramePlan) -> ReelResult<Vec<PathBuf>> {
    let stale = plan.stale_outputs()?;
    for path in &stale {
        std::fs::remove_file(path).map_err(|e| ReelError::io(path, e))?;
        tracing::warn!(path = %path.display(), "purged stale frame");
    }
    Ok(stale)
}

fn prepare_out_dir(out_dir: &Path, create: bool) -> ReelResult<()> {
    if create {
        return std::fs::create_dir_all(out_dir).map_err(|e| ReelError::io(out_dir, e));
    }
    if !out_dir.is_dir() {
        return Err(ReelError::io(
            out_dir,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "output directory does not exist",
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
