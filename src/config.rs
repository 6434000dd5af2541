use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::reconcile::RawLinks;

pub const DEFAULT_CONFIG_FILE: &str = "sheet-sync.json";
pub const DEFAULT_MANIFEST_URL: &str = "https://raw.githubusercontent.com/CITIES-Dashboard/cities-dashboard.github.io/main/frontend/src/temp_database.json";
pub const DEFAULT_RAW_LINK_BASE: &str = "https://raw.githubusercontent.com/CITIES-Dashboard/datasets";
pub const DEFAULT_LATEST_REF: &str = "main";
pub const DEFAULT_METADATA_FILE: &str = "datasets_metadata.json";

/// Optional on-disk settings. Credentials never live here.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub manifest_url: Option<String>,
    #[serde(default)]
    pub raw_link_base: Option<String>,
    #[serde(default)]
    pub latest_ref: Option<String>,
    #[serde(default)]
    pub metadata_file: Option<String>,
}

/// Values supplied on the command line or through the environment. These
/// win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub commit_ref: Option<String>,
    pub manifest_url: Option<String>,
    pub root: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_key: String,
    pub manifest_url: String,
    pub root: Utf8PathBuf,
    pub metadata_file: String,
    pub raw_links: RawLinks,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, SyncError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| SyncError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| SyncError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, SyncError> {
        let api_key = non_empty(overrides.api_key)
            .ok_or(SyncError::MissingSetting("Sheets API key (SHEETS_NEW_API_KEY)"))?;
        let commit_ref = non_empty(overrides.commit_ref)
            .ok_or(SyncError::MissingSetting("commit reference (CURRENT_COMMIT)"))?;

        let manifest_url = non_empty(overrides.manifest_url)
            .or(non_empty(config.manifest_url))
            .unwrap_or_else(|| DEFAULT_MANIFEST_URL.to_string());
        let base = non_empty(config.raw_link_base)
            .unwrap_or_else(|| DEFAULT_RAW_LINK_BASE.to_string());
        let latest_ref =
            non_empty(config.latest_ref).unwrap_or_else(|| DEFAULT_LATEST_REF.to_string());
        let metadata_file =
            non_empty(config.metadata_file).unwrap_or_else(|| DEFAULT_METADATA_FILE.to_string());

        Ok(ResolvedConfig {
            api_key,
            manifest_url,
            root: overrides.root.unwrap_or_else(|| Utf8PathBuf::from(".")),
            metadata_file,
            raw_links: RawLinks::new(base, latest_ref, commit_ref),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
