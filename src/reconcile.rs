use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Gid, SheetName};
use crate::encode::fingerprint;
use crate::error::SyncError;
use crate::metadata::{DatasetEntry, VersionRecord};
use crate::store::Store;

/// Download link patterns: `<base>/<ref>/<project>/<file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLinks {
    base: String,
    latest_ref: String,
    commit_ref: String,
}

impl RawLinks {
    pub fn new(
        base: impl Into<String>,
        latest_ref: impl Into<String>,
        commit_ref: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            latest_ref: latest_ref.into(),
            commit_ref: commit_ref.into(),
        }
    }

    /// Link that always resolves to the newest file.
    pub fn latest(&self, project_id: &str, file_name: &str) -> String {
        format!("{}/{}/{project_id}/{file_name}", self.base, self.latest_ref)
    }

    /// Link frozen at this run's commit.
    pub fn pinned(&self, project_id: &str, file_name: &str) -> String {
        format!("{}/{}/{project_id}/{file_name}", self.base, self.commit_ref)
    }
}

/// A freshly fetched, sanitized and encoded table.
#[derive(Debug, Clone)]
pub struct Export {
    pub sheet_name: SheetName,
    pub row_count: usize,
    pub csv: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Unchanged,
    Written,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Unchanged => f.pad("unchanged"),
            Action::Written => f.pad("written"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub gid: String,
    pub file_name: String,
    pub action: Action,
    pub renamed_from: Option<String>,
    pub record: Option<VersionRecord>,
}

/// Decides, per dataset, whether the file on disk and its history need to
/// move forward.
pub struct Reconciler<'a> {
    store: &'a Store,
    links: &'a RawLinks,
    run_date: NaiveDate,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a Store, links: &'a RawLinks, run_date: NaiveDate) -> Self {
        Self {
            store,
            links,
            run_date,
        }
    }

    pub fn reconcile(
        &self,
        project_id: &str,
        entries: &mut Vec<DatasetEntry>,
        gid: &Gid,
        export: &Export,
    ) -> Result<Outcome, SyncError> {
        if export.row_count == 0 {
            return Err(SyncError::InvalidFetch {
                project: project_id.to_string(),
                gid: gid.to_string(),
            });
        }

        let name = export.sheet_name.sanitized();
        let file_name = export.sheet_name.file_name();
        let target = self.store.dataset_path(project_id, &file_name);

        let previous_name = entries
            .iter()
            .find(|entry| entry.id == gid.as_str())
            .and_then(DatasetEntry::latest)
            .map(|record| record.name.clone());

        // A rename upstream moves the file before anything is compared.
        let renamed_from = match previous_name {
            Some(previous) if previous != name => {
                self.move_previous(project_id, previous, &file_name)?
            }
            _ => None,
        };

        let existing = Store::read_if_exists(&target)?.unwrap_or_default();
        if fingerprint(&existing) == fingerprint(&export.csv) {
            debug!(project = project_id, %gid, file = %file_name, "content unchanged");
            return Ok(Outcome {
                gid: gid.to_string(),
                file_name,
                action: Action::Unchanged,
                renamed_from,
                record: None,
            });
        }

        Store::write_bytes_atomic(&target, export.csv.as_bytes())?;
        let record = VersionRecord {
            name,
            raw_link: self.links.latest(project_id, &file_name),
            version: self.run_date.format("%Y-%m-%d").to_string(),
            size_in_bytes: Store::file_size(&target)?,
        };

        let idx = match entries.iter().position(|entry| entry.id == gid.as_str()) {
            Some(idx) => idx,
            None => {
                entries.push(DatasetEntry::new(gid.as_str()));
                entries.len() - 1
            }
        };
        push_version(&mut entries[idx], record.clone(), |previous| {
            self.links.pinned(project_id, &format!("{}.csv", previous.name))
        });

        info!(
            project = project_id,
            %gid,
            file = %file_name,
            bytes = record.size_in_bytes,
            "wrote new version"
        );
        Ok(Outcome {
            gid: gid.to_string(),
            file_name,
            action: Action::Written,
            renamed_from,
            record: Some(record),
        })
    }

    fn move_previous(
        &self,
        project_id: &str,
        previous: String,
        file_name: &str,
    ) -> Result<Option<String>, SyncError> {
        let from = self.store.dataset_path(project_id, &format!("{previous}.csv"));
        let to = self.store.dataset_path(project_id, file_name);
        Store::rename(&from, &to)?;
        info!(project = project_id, from = %from, to = %to, "renamed dataset file");
        Ok(Some(previous))
    }
}

/// Prepends `record` to the history. The former newest record gets its link
/// pinned through `pin` first, then any record sharing the new record's date
/// is dropped so a date never appears twice.
pub fn push_version(
    entry: &mut DatasetEntry,
    record: VersionRecord,
    pin: impl FnOnce(&VersionRecord) -> String,
) {
    if let Some(previous) = entry.versions.first_mut() {
        previous.raw_link = pin(previous);
        entry.versions.retain(|version| version.version != record.version);
    }
    entry.versions.insert(0, record);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, version: &str) -> VersionRecord {
        VersionRecord {
            name: name.to_string(),
            raw_link: format!("https://x/main/P1/{name}.csv"),
            version: version.to_string(),
            size_in_bytes: 1,
        }
    }

    fn pin(previous: &VersionRecord) -> String {
        format!("https://x/abc/P1/{}.csv", previous.name)
    }

    #[test]
    fn push_into_empty_history() {
        let mut entry = DatasetEntry::new("42");
        push_version(&mut entry, record("air", "2024-01-01"), pin);
        assert_eq!(entry.versions.len(), 1);
        assert_eq!(entry.versions[0].raw_link, "https://x/main/P1/air.csv");
    }

    #[test]
    fn push_pins_previous_link() {
        let mut entry = DatasetEntry::new("42");
        entry.versions.push(record("old-air", "2024-01-01"));
        push_version(&mut entry, record("air", "2024-01-02"), pin);

        assert_eq!(entry.versions.len(), 2);
        assert_eq!(entry.versions[0].version, "2024-01-02");
        assert_eq!(entry.versions[1].raw_link, "https://x/abc/P1/old-air.csv");
    }

    #[test]
    fn push_replaces_same_day_record() {
        let mut entry = DatasetEntry::new("42");
        entry.versions.push(record("air", "2024-01-02"));
        entry.versions.push(record("air", "2024-01-01"));
        let mut newer = record("air", "2024-01-02");
        newer.size_in_bytes = 99;
        push_version(&mut entry, newer, pin);

        let dates: Vec<_> = entry.versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-01"]);
        assert_eq!(entry.versions[0].size_in_bytes, 99);
    }

    #[test]
    fn links_trim_trailing_slash() {
        let links = RawLinks::new("https://raw.example.com/datasets/", "main", "abc123");
        assert_eq!(links.latest("P1", "a.csv"), "https://raw.example.com/datasets/main/P1/a.csv");
        assert_eq!(links.pinned("P1", "a.csv"), "https://raw.example.com/datasets/abc123/P1/a.csv");
    }
}
