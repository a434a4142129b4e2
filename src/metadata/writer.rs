use std::{
    fs::File,
    io::{BufReader, Write as _},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::foundation::{
    core::ReelConfig,
    error::{ReelError, ReelResult},
};

/// Persists the [`ReelConfig`] record read by the frame viewer.
///
/// The record is written to a hidden sibling file first and renamed over the destination, so a
/// viewer polling the path sees either the previous record or the complete new one.
#[derive(Clone, Debug)]
pub struct MetadataWriter {
    path: PathBuf,
    create_dirs: bool,
}

impl MetadataWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_dirs: false,
        }
    }

    /// Create the destination directory when it is missing instead of failing.
    pub fn create_dirs(mut self, create: bool) -> Self {
        self.create_dirs = create;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn write(&self, cfg: &ReelConfig) -> ReelResult<()> {
        let dir = parent_dir(&self.path);
        if self.create_dirs {
            std::fs::create_dir_all(dir).map_err(|e| ReelError::io(dir, e))?;
        } else if !dir.is_dir() {
            return Err(ReelError::io(
                dir,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "metadata directory does not exist",
                ),
            ));
        }

        let bytes = serde_json::to_vec(cfg)
            .map_err(|e| ReelError::serde(format!("encode metadata: {e}")))?;

        let mut tmp = temp_sibling(&self.path, dir)?;
        tmp.write_all(&bytes)
            .map_err(|e| ReelError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| ReelError::io(tmp.path(), e))?;
        // On failure the temp file comes back inside the error and is removed when dropped.
        tmp.persist(&self.path)
            .map_err(|e| ReelError::io(&self.path, e.error))?;

        tracing::info!(read_max = cfg.read_max, "wrote metadata");
        Ok(())
    }
}

/// Read a metadata record written by [`MetadataWriter::write`].
pub fn load_metadata(path: &Path) -> ReelResult<ReelConfig> {
    let f = File::open(path).map_err(|e| ReelError::io(path, e))?;
    serde_json::from_reader(BufReader::new(f))
        .map_err(|e| ReelError::serde(format!("parse metadata '{}': {e}", path.display())))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// A hidden, uniquely named file next to `path`, so concurrent writers never share one.
fn temp_sibling(path: &Path, dir: &Path) -> ReelResult<NamedTempFile> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "metadata".to_string());
    tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| ReelError::io(dir, e))
}

#[cfg(test)]
#[path = "../../tests/unit/metadata/writer.rs"]
mod tests;
