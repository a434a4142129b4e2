use std::{fmt, path::PathBuf, time::Duration};

use crate::foundation::error::{ReelError, ReelResult};

/// Read index handed to the renderer for the ruler frame.
///
/// It lies far outside any real read index, so the renderer draws the coordinate ruler without
/// a read.
pub const RULER_READ_INDEX: u32 = 10_000;

/// Per-run configuration shared with the downstream viewer through the metadata file.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ReelConfig {
    /// Highest read index rendered (inclusive).
    pub read_max: u32,
}

impl ReelConfig {
    pub fn new(read_max: u32) -> ReelResult<Self> {
        let cfg = Self { read_max };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.read_max >= RULER_READ_INDEX {
            return Err(ReelError::validation(format!(
                "read_max must be < {RULER_READ_INDEX} (the ruler sentinel index), got {}",
                self.read_max
            )));
        }
        Ok(())
    }

    /// Number of frames in a reel: ruler, every read, coverage.
    pub fn frame_count(self) -> u64 {
        u64::from(self.read_max) + 3
    }

    /// Output slot of the coverage frame, directly after the last read slot.
    pub fn coverage_slot(self) -> u64 {
        u64::from(self.read_max) + 2
    }
}

/// What a frame visualizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameKind {
    /// Coordinate ruler, independent of any read.
    Ruler,
    /// One read, by index.
    Read(u32),
    /// Aggregate coverage across the region.
    Coverage,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ruler => write!(f, "ruler"),
            Self::Read(i) => write!(f, "read {i}"),
            Self::Coverage => write!(f, "coverage"),
        }
    }
}

/// How one renderer process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    /// Non-zero exit code.
    Code(i32),
    /// Terminated without an exit code (signal).
    Signal,
    /// Killed after exceeding the per-invocation timeout.
    TimedOut(Duration),
}

impl ExitOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn from_status(status: std::process::ExitStatus) -> Self {
        if status.success() {
            return Self::Success;
        }
        match status.code() {
            Some(code) => Self::Code(code),
            None => Self::Signal,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "exited successfully"),
            Self::Code(code) => write!(f, "exited with code {code}"),
            Self::Signal => write!(f, "was terminated by a signal"),
            Self::TimedOut(limit) => write!(f, "timed out after {:.1}s", limit.as_secs_f64()),
        }
    }
}

/// A frame whose last attempt did not succeed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameFailure {
    pub kind: FrameKind,
    pub slot: u64,
    pub out_path: PathBuf,
    pub outcome: ExitOutcome,
    pub attempts: u32,
    /// Trailing stderr of the last attempt, trimmed.
    pub stderr: String,
}

impl fmt::Display for FrameFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frame (slot {}, '{}') {} after {} attempt(s)",
            self.kind,
            self.slot,
            self.out_path.display(),
            self.outcome,
            self.attempts
        )?;
        if !self.stderr.is_empty() {
            write!(f, ": {}", self.stderr)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
