use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, info_span};

use crate::config::ResolvedConfig;
use crate::domain::{DatasetSpec, FetchedTable, Gid, Project};
use crate::encode::encode_csv;
use crate::error::SyncError;
use crate::manifest::ManifestSource;
use crate::metadata::{MetadataStore, sort_by_gid_order};
use crate::reconcile::{Action, Export, Outcome, Reconciler};
use crate::sanitize::sanitize_rows;
use crate::sheets::{SheetSource, TableRequest};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_date: String,
    pub projects: usize,
    pub datasets: Vec<DatasetReport>,
}

impl SyncReport {
    pub fn written(&self) -> usize {
        self.datasets
            .iter()
            .filter(|item| item.outcome.action == Action::Written)
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    pub project: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Runs one sync pass: manifest, then every dataset of every project in
/// manifest order, then a single write of the metadata document.
pub struct Syncer<M: ManifestSource, S: SheetSource> {
    config: ResolvedConfig,
    store: Store,
    manifest: M,
    sheets: S,
}

impl<M: ManifestSource, S: SheetSource> Syncer<M, S> {
    pub fn new(config: ResolvedConfig, manifest: M, sheets: S) -> Self {
        let store = Store::new(config.root.clone(), config.metadata_file.clone());
        Self {
            config,
            store,
            manifest,
            sheets,
        }
    }

    /// Any error aborts the pass. Files already written stay on disk, but
    /// the metadata document is only written when every dataset succeeded.
    pub fn run(&self, run_date: NaiveDate) -> Result<SyncReport, SyncError> {
        let metadata_path = self.store.metadata_path();
        let mut metadata = MetadataStore::load(&metadata_path)?;

        // An unreachable manifest means nothing to do, not a failed run.
        let projects = match self.manifest.fetch_manifest(&self.config.manifest_url) {
            Ok(projects) => projects,
            Err(err) => {
                error!(url = %self.config.manifest_url, error = %err, "manifest fetch failed");
                Vec::new()
            }
        };

        let reconciler = Reconciler::new(&self.store, &self.config.raw_links, run_date);
        let mut datasets = Vec::new();
        let mut synced_projects = 0;

        for project in &projects {
            if !project.has_datasets() {
                debug!(project = %project.id, "no dataset tables, skipping");
                continue;
            }
            let _span = info_span!("project", id = %project.id).entered();
            self.store.ensure_project_dir(&project.id)?;

            let entries = metadata.project_mut(&project.id);
            for (gid, spec) in project.datasets() {
                let export = self.export(project, gid, spec)?;
                let outcome = reconciler.reconcile(&project.id, entries, gid, &export)?;
                datasets.push(DatasetReport {
                    project: project.id.clone(),
                    outcome,
                });
            }
            sort_by_gid_order(entries, &project.gid_order());
            synced_projects += 1;
        }

        metadata.persist(&metadata_path)?;

        let report = SyncReport {
            run_date: run_date.format("%Y-%m-%d").to_string(),
            projects: synced_projects,
            datasets,
        };
        info!(
            projects = report.projects,
            datasets = report.datasets.len(),
            written = report.written(),
            "sync finished"
        );
        Ok(report)
    }

    /// Fetches, sanitizes and encodes one table. A failed fetch is fatal for
    /// the run.
    fn export(&self, project: &Project, gid: &Gid, spec: &DatasetSpec) -> Result<Export, SyncError> {
        let request = TableRequest {
            sheet_id: &project.sheet_id,
            gid,
            api_key: &self.config.api_key,
            query: spec.query(),
            include_headers: spec.include_headers(),
        };
        let table = self.sheets.fetch_table(&request).map_err(|err| {
            error!(%gid, sheet = %project.sheet_id, error = %err, "table fetch failed");
            SyncError::InvalidFetch {
                project: project.id.clone(),
                gid: gid.to_string(),
            }
        })?;

        let sheet_name = table.sheet_name.clone();
        let rows = FetchedTable {
            rows: sanitize_rows(table.rows),
            ..table
        }
        .into_rows();

        Ok(Export {
            sheet_name,
            row_count: rows.len(),
            csv: encode_csv(&rows),
        })
    }
}
