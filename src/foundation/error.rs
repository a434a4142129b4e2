use std::path::PathBuf;

use crate::foundation::core::FrameFailure;

/// Convenience result type used across readreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by the orchestration APIs.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// None of the renderer candidates exists as an executable file.
    #[error("renderer binary not found (tried: {})", display_paths(.0))]
    BinaryNotFound(Vec<PathBuf>),

    /// Filesystem or process-spawn failure tied to a concrete path.
    #[error("io error at '{}': {source}", .path.display())]
    Io {
        /// Path being read, written, removed or executed.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A single frame failed and the run was aborted.
    #[error("render failure: {0}")]
    RenderFailure(FrameFailure),

    /// One or more frames failed; every failure is listed in frame order.
    #[error("render failures ({} frames): {}", .0.len(), display_failures(.0))]
    RenderFailures(Vec<FrameFailure>),

    /// The renderer reported success but expected output files are absent.
    #[error("incomplete frame set: missing {}", display_paths(.missing))]
    IncompleteFrameSet {
        /// Output paths that were expected but not found.
        missing: Vec<PathBuf>,
    },

    /// Invalid user-provided options or command template.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing the metadata record or options.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`ReelError::Io`] value for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Frames that failed rendering, if this error is a render failure.
    pub fn failed_frames(&self) -> &[FrameFailure] {
        match self {
            Self::RenderFailure(f) => std::slice::from_ref(f),
            Self::RenderFailures(fs) => fs,
            _ => &[],
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_failures(failures: &[FrameFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
