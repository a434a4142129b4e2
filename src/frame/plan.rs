use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    foundation::{
        core::{FrameKind, RULER_READ_INDEX, ReelConfig},
        error::{ReelError, ReelResult},
    },
    frame::template::CommandTemplate,
};

/// Renderer flag for read frames: hide the x-axis ruler, which has its own frame.
pub const SINGLE_READ_FLAG: &str = "-*";
/// Renderer flag for the coverage frame: hide alignments, keep coverage.
pub const COVERAGE_FLAG: &str = "-A";

/// `<out_dir>/<slot>.png`
pub fn frame_path(out_dir: &Path, slot: u64) -> PathBuf {
    out_dir.join(format!("{slot}.png"))
}

/// One renderer invocation's worth of work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    /// Output file number; also the frame's position in the reel.
    pub slot: u64,
    pub out_path: PathBuf,
}

impl Frame {
    /// Value passed to the renderer's `-_` option.
    pub fn read_index(&self) -> u32 {
        match self.kind {
            FrameKind::Ruler => RULER_READ_INDEX,
            FrameKind::Read(i) => i,
            FrameKind::Coverage => 0,
        }
    }

    pub fn frame_flag(&self) -> Option<&'static str> {
        match self.kind {
            FrameKind::Ruler => None,
            FrameKind::Read(_) => Some(SINGLE_READ_FLAG),
            FrameKind::Coverage => Some(COVERAGE_FLAG),
        }
    }

    /// `-t<threads> vis -_ <index> <template...> [-* | -A] -o <out_path>`
    pub fn render_args(&self, threads: u32, template: &CommandTemplate) -> Vec<OsString> {
        let mut args = Vec::with_capacity(template.args().len() + 7);
        args.push(OsString::from(format!("-t{threads}")));
        args.push(OsString::from("vis"));
        args.push(OsString::from("-_"));
        args.push(OsString::from(self.read_index().to_string()));
        args.extend(template.args().iter().map(OsString::from));
        if let Some(flag) = self.frame_flag() {
            args.push(OsString::from(flag));
        }
        args.push(OsString::from("-o"));
        args.push(self.out_path.clone().into_os_string());
        args
    }
}

/// Ordered frame layout of a reel: ruler, reads `0..=read_max`, coverage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePlan {
    config: ReelConfig,
    out_dir: PathBuf,
}

impl FramePlan {
    pub fn new(config: ReelConfig, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            out_dir: out_dir.into(),
        }
    }

    pub fn config(&self) -> ReelConfig {
        self.config
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn len(&self) -> u64 {
        self.config.frame_count()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Frame at `position` in reel order, if within the plan.
    pub fn frame_at(&self, position: u64) -> Option<Frame> {
        let coverage = self.config.coverage_slot();
        let kind = match position {
            0 => FrameKind::Ruler,
            p if p < coverage => FrameKind::Read(u32::try_from(p - 1).ok()?),
            p if p == coverage => FrameKind::Coverage,
            _ => return None,
        };
        Some(Frame {
            kind,
            slot: position,
            out_path: frame_path(&self.out_dir, position),
        })
    }

    /// Frames in reel order, built on demand.
    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        (0..self.len()).filter_map(move |p| self.frame_at(p))
    }

    pub fn expected_paths(&self) -> Vec<PathBuf> {
        self.frames().map(|f| f.out_path).collect()
    }

    /// Expected outputs that are not regular files on disk.
    pub fn missing_outputs(&self) -> Vec<PathBuf> {
        self.frames()
            .map(|f| f.out_path)
            .filter(|p| !p.is_file())
            .collect()
    }

    /// Numbered `.png` files in the output directory above the coverage slot, sorted by slot.
    ///
    /// They come from an earlier run with a larger `read_max`. A missing output directory has
    /// no stale frames.
    pub fn stale_outputs(&self) -> ReelResult<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.out_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ReelError::io(&self.out_dir, e)),
        };

        let coverage = self.config.coverage_slot();
        let mut stale = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ReelError::io(&self.out_dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            // Only names this crate writes: `007.png` or `+9.png` parse but were never frames.
            let Some(slot) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok().filter(|n| n.to_string() == s))
            else {
                continue;
            };
            if slot > coverage && path.is_file() {
                stale.push((slot, path));
            }
        }
        stale.sort();
        Ok(stale.into_iter().map(|(_, p)| p).collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/plan.rs"]
mod tests;
