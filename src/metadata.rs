use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::store::Store;

/// One dated snapshot of a dataset's CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub name: String,
    pub raw_link: String,
    pub version: String,
    pub size_in_bytes: u64,
}

/// Version history of one gid, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub id: String,
    #[serde(default)]
    pub versions: Vec<VersionRecord>,
}

impl DatasetEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            versions: Vec::new(),
        }
    }

    pub fn latest(&self) -> Option<&VersionRecord> {
        self.versions.first()
    }
}

/// The whole `datasets_metadata.json` document: project id to the ordered
/// dataset histories of that project. Projects keep their document order;
/// new ones are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataStore {
    projects: IndexMap<String, Vec<DatasetEntry>>,
}

impl MetadataStore {
    /// Reads the document, or starts empty when the file does not exist.
    pub fn load(path: &Utf8Path) -> Result<Self, SyncError> {
        let Some(content) = Store::read_if_exists(path)? else {
            return Ok(Self::default());
        };
        serde_json::from_slice(&content).map_err(|err| SyncError::MetadataParse {
            path: path.to_string(),
            message: err.to_string(),
        })
    }

    /// Replaces the document on disk, pretty-printed with two-space indent.
    pub fn persist(&self, path: &Utf8Path) -> Result<(), SyncError> {
        let content =
            serde_json::to_vec_pretty(self).map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Store::write_bytes_atomic(path, &content)
    }

    pub fn project(&self, project_id: &str) -> Option<&[DatasetEntry]> {
        self.projects.get(project_id).map(Vec::as_slice)
    }

    /// Histories for a project, created empty on first use.
    pub fn project_mut(&mut self, project_id: &str) -> &mut Vec<DatasetEntry> {
        self.projects.entry(project_id.to_string()).or_default()
    }

    pub fn project_ids(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }
}

/// Reorders entries to follow `gid_order`. Entries whose id is not listed
/// move to the front, keeping their relative order.
pub fn sort_by_gid_order(entries: &mut [DatasetEntry], gid_order: &[String]) {
    entries.sort_by_key(|entry| gid_order.iter().position(|gid| *gid == entry.id));
}
