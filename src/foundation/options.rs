use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    binary::resolver::default_candidates,
    foundation::{
        core::ReelConfig,
        error::{ReelError, ReelResult},
    },
};

/// Upper bound on per-frame retries.
pub const MAX_RETRIES: u32 = 8;

/// File name of the metadata record inside the output directory.
pub const METADATA_FILE_NAME: &str = "reads.json";

/// What the orchestrator does when a frame fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop issuing invocations at the first failed frame.
    #[default]
    FailFast,
    /// Render every frame, then report all failures together.
    BestEffort,
}

/// What happens to numbered frames left over from a previous, larger run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    #[default]
    Keep,
    /// Delete `<slot>.png` files above the new coverage slot before rendering.
    Purge,
}

/// Worker configuration for issuing renderer invocations.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FrameThreading {
    /// Render frames on a worker pool instead of one after another.
    pub parallel: bool,
    /// Pool size; `None` lets rayon pick.
    pub threads: Option<usize>,
}

/// Library-level options for a full reel run.
///
/// Every field has a default, so a JSON options file only needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReelOptions {
    pub read_max: u32,
    /// Value passed to the renderer as `-t<threads>`.
    pub renderer_threads: u32,
    pub out_dir: PathBuf,
    /// Defaults to `<out_dir>/reads.json`.
    pub metadata_path: Option<PathBuf>,
    /// Explicit renderer path, tried before `candidates`.
    pub renderer: Option<PathBuf>,
    pub candidates: Vec<PathBuf>,
    /// Renderer flags shared by every frame; empty selects the built-in template.
    pub template: Vec<String>,
    pub create_dirs: bool,
    pub failure_policy: FailurePolicy,
    pub stale_policy: StalePolicy,
    pub timeout_secs: Option<u64>,
    pub retries: u32,
    pub threading: FrameThreading,
}

impl Default for ReelOptions {
    fn default() -> Self {
        Self {
            read_max: 20,
            renderer_threads: 12,
            out_dir: PathBuf::from("dnd"),
            metadata_path: None,
            renderer: None,
            candidates: default_candidates(),
            template: Vec::new(),
            create_dirs: false,
            failure_policy: FailurePolicy::default(),
            stale_policy: StalePolicy::default(),
            timeout_secs: None,
            retries: 0,
            threading: FrameThreading::default(),
        }
    }
}

impl ReelOptions {
    pub fn validate(&self) -> ReelResult<()> {
        self.reel_config().validate()?;
        if self.renderer_threads == 0 {
            return Err(ReelError::validation("renderer_threads must be >= 1"));
        }
        if self.out_dir.as_os_str().is_empty() {
            return Err(ReelError::validation("out_dir must not be empty"));
        }
        if self.timeout_secs == Some(0) {
            return Err(ReelError::validation("timeout_secs must be >= 1 when set"));
        }
        if self.retries > MAX_RETRIES {
            return Err(ReelError::validation(format!(
                "retries must be <= {MAX_RETRIES}, got {}",
                self.retries
            )));
        }
        if self.threading.threads == Some(0) {
            return Err(ReelError::validation(
                "threading 'threads' must be >= 1 when set",
            ));
        }
        if self.renderer.is_none() && self.candidates.is_empty() {
            return Err(ReelError::validation(
                "at least one renderer candidate path is required",
            ));
        }
        Ok(())
    }

    pub fn reel_config(&self) -> ReelConfig {
        ReelConfig {
            read_max: self.read_max,
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.metadata_path
            .clone()
            .unwrap_or_else(|| self.out_dir.join(METADATA_FILE_NAME))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Renderer candidates in priority order, explicit override first.
    pub fn renderer_candidates(&self) -> Vec<PathBuf> {
        self.renderer
            .iter()
            .chain(self.candidates.iter())
            .cloned()
            .collect()
    }

    /// Load options from a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> ReelResult<Self> {
        let f = File::open(path).map_err(|e| ReelError::io(path, e))?;
        serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            ReelError::serde(format!("parse options '{}': {e}", path.display()))
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/options.rs"]
mod tests;
