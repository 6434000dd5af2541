use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::error::SyncError;

/// On-disk layout: one directory per project under the root, one CSV per
/// dataset inside it, and the shared metadata document at the root.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
    metadata_file: String,
}

impl Store {
    pub fn new(root: Utf8PathBuf, metadata_file: impl Into<String>) -> Self {
        Self {
            root,
            metadata_file: metadata_file.into(),
        }
    }

    pub fn project_dir(&self, project_id: &str) -> Utf8PathBuf {
        self.root.join(project_id)
    }

    pub fn dataset_path(&self, project_id: &str, file_name: &str) -> Utf8PathBuf {
        self.project_dir(project_id).join(file_name)
    }

    pub fn metadata_path(&self) -> Utf8PathBuf {
        self.root.join(&self.metadata_file)
    }

    pub fn ensure_project_dir(&self, project_id: &str) -> Result<Utf8PathBuf, SyncError> {
        let dir = self.project_dir(project_id);
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("create {dir}: {err}")))?;
        Ok(dir)
    }

    /// Contents of `path`, or `None` when nothing is there yet.
    pub fn read_if_exists(path: &Utf8Path) -> Result<Option<Vec<u8>>, SyncError> {
        match fs::read(path.as_std_path()) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SyncError::Filesystem(format!("read {path}: {err}"))),
        }
    }

    pub fn rename(from: &Utf8Path, to: &Utf8Path) -> Result<(), SyncError> {
        fs::rename(from.as_std_path(), to.as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("rename {from} -> {to}: {err}")))
    }

    pub fn file_size(path: &Utf8Path) -> Result<u64, SyncError> {
        fs::metadata(path.as_std_path())
            .map(|meta| meta.len())
            .map_err(|err| SyncError::Filesystem(format!("stat {path}: {err}")))
    }

    /// Writes through a temp file in the destination directory, then swaps
    /// it into place.
    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), SyncError> {
        let parent = path
            .parent()
            .ok_or_else(|| SyncError::Filesystem(format!("invalid destination path {path}")))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix(".sheet-sync")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        io::Write::write_all(&mut temp, content)
            .map_err(|err| SyncError::Filesystem(format!("write {path}: {err}")))?;
        temp.persist(path.as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("persist {path}: {err}")))?;
        Ok(())
    }
}
