//! readreel drives the `hgb` alignment renderer over a read set and produces an ordered reel of
//! PNG frames for a slider-style viewer.
//!
//! A reel with `read_max = N` is `N + 3` frames under the output directory:
//!
//! | slot        | frame    | renderer flags                |
//! |-------------|----------|-------------------------------|
//! | `0`         | ruler    | `-_ 10000`                    |
//! | `1..=N+1`   | read `i` | `-_ i ... -*` (slot `i + 1`)  |
//! | `N+2`       | coverage | `-_ 0 ... -A`                 |
//!
//! plus a `reads.json` record (`{"read_max":N}`) written before the first frame.
//!
//! # Pipeline overview
//!
//! 1. **Resolve**: [`BinaryResolver`] picks the renderer (debug build first, then release)
//! 2. **Describe**: [`MetadataWriter`] atomically writes the [`ReelConfig`] record
//! 3. **Render**: [`FrameOrchestrator`] launches one renderer process per [`Frame`] of a
//!    [`FramePlan`], through a [`FrameLauncher`]
//!
//! [`render_reel`] runs all three and verifies the resulting frame set.
#![forbid(unsafe_code)]

mod binary;
mod foundation;
mod frame;
mod metadata;
mod render;

pub use binary::resolver::{
    BinaryResolver, DEFAULT_PROFILES, RENDERER_NAME, default_candidates, is_executable_file,
};
pub use foundation::core::{ExitOutcome, FrameFailure, FrameKind, RULER_READ_INDEX, ReelConfig};
pub use foundation::error::{ReelError, ReelResult};
pub use foundation::options::{
    FailurePolicy, FrameThreading, MAX_RETRIES, METADATA_FILE_NAME, ReelOptions, StalePolicy,
};
pub use frame::plan::{COVERAGE_FLAG, Frame, FramePlan, SINGLE_READ_FLAG, frame_path};
pub use frame::template::{CommandTemplate, DEFAULT_TEMPLATE};
pub use metadata::writer::{MetadataWriter, load_metadata};
pub use render::launcher::{FrameLauncher, Invocation, LaunchReport, ProcessLauncher};
pub use render::orchestrator::{FrameOrchestrator, OrchestratorOpts, RunStats};
pub use render::pipeline::{ReelReport, purge_stale_frames, render_reel, verify_frame_set};
