use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use data_encoding::HEXLOWER;
use tempfile::{Builder, NamedTempFile};

use crate::error::{AtPath, SortError};

/// Per run directory holding chunk and merge files.
///
/// The directory name carries the process id and a random suffix so concurrent runs, in
/// this process or in others, never share it. Dropping the workspace removes the directory
/// if it is empty, otherwise the directory and whatever is left in it stay in place.
#[derive(Debug)]
pub(crate) struct Workspace {
    path: PathBuf,
}

impl Workspace {
    pub(crate) fn new(root: &Path) -> Result<Workspace, SortError> {
        fs::create_dir_all(root).at_path(root)?;
        let name = format!(
            "csvsort-{}-{}",
            std::process::id(),
            HEXLOWER.encode(&rand::random::<[u8; 8]>())
        );
        let path = root.join(name);
        fs::create_dir(&path).at_path(&path)?;
        log::debug!("Created workspace {}", path.display());
        Ok(Workspace { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Create a uniquely named file in the workspace. The file is removed if dropped before
    /// it is kept.
    pub(crate) fn create_file(&self, prefix: &str) -> Result<NamedTempFile, SortError> {
        create_tmp_file(&self.path, prefix)
    }

    /// Best effort removal of every file in the workspace after a failed run.
    pub(crate) fn clear(&self) {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Failed to list workspace {}: {}", self.path.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            if let Err(e) = fs::remove_file(entry.path()) {
                log::warn!("Failed to remove {}: {}", entry.path().display(), e);
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir(&self.path) {
            log::warn!("Workspace {} was not removed: {}", self.path.display(), e);
        }
    }
}

pub(crate) fn create_tmp_file(dir: &Path, prefix: &str) -> Result<NamedTempFile, SortError> {
    Builder::new()
        .prefix(prefix)
        .suffix(".csv")
        .tempfile_in(dir)
        .at_path(dir)
}

/// Reader for chunk and merge files. They are written by [chunk_writer] and never have a
/// header.
pub(crate) fn chunk_reader(path: &Path) -> Result<csv::Reader<File>, SortError> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .at_path(path)
}

pub(crate) fn chunk_writer<W: Write>(writer: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(writer)
}
