use std::path::{Path, PathBuf};

use crate::foundation::error::{ReelError, ReelResult};

/// Name of the renderer executable inside a cargo target directory.
pub const RENDERER_NAME: &str = if cfg!(windows) { "hgb.exe" } else { "hgb" };

/// Build profiles searched by default, in priority order.
pub const DEFAULT_PROFILES: [&str; 2] = ["debug", "release"];

/// `./target/debug/hgb` then `./target/release/hgb`.
pub fn default_candidates() -> Vec<PathBuf> {
    DEFAULT_PROFILES
        .iter()
        .map(|profile| PathBuf::from(".").join("target").join(profile).join(RENDERER_NAME))
        .collect()
}

/// Picks the renderer executable from an ordered list of candidate paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryResolver {
    candidates: Vec<PathBuf>,
}

impl Default for BinaryResolver {
    fn default() -> Self {
        Self::new(default_candidates())
    }
}

impl BinaryResolver {
    pub fn new<I, P>(candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    /// Put `path` ahead of every existing candidate.
    pub fn prepend(mut self, path: impl Into<PathBuf>) -> Self {
        self.candidates.insert(0, path.into());
        self
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// First candidate that is an executable file.
    pub fn resolve(&self) -> ReelResult<PathBuf> {
        for candidate in &self.candidates {
            if is_executable_file(candidate) {
                tracing::debug!(path = %candidate.display(), "resolved renderer binary");
                return Ok(candidate.clone());
            }
            tracing::trace!(path = %candidate.display(), "renderer candidate not usable");
        }
        Err(ReelError::BinaryNotFound(self.candidates.clone()))
    }
}

/// `true` for a regular file that (on Unix) carries at least one execute bit.
pub fn is_executable_file(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/binary/resolver.rs"]
mod tests;
