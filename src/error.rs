use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("invalid sheet name or empty data for GID {gid} in project {project}")]
    #[diagnostic(help("the run was aborted so that metadata does not drift from the files on disk"))]
    InvalidFetch { project: String, gid: String },

    #[error("manifest request failed: {0}")]
    ManifestHttp(String),

    #[error("manifest returned status {status}: {message}")]
    ManifestStatus { status: u16, message: String },

    #[error("failed to parse manifest: {0}")]
    ManifestParse(String),

    #[error("Sheets request failed: {0}")]
    SheetsHttp(String),

    #[error("Sheets returned status {status}: {message}")]
    SheetsStatus { status: u16, message: String },

    #[error("sheet with GID {gid} not found in spreadsheet {sheet_id}")]
    SheetNotFound { sheet_id: String, gid: String },

    #[error("invalid sheet name: {0:?}")]
    InvalidSheetName(String),

    #[error("invalid GID: {0}")]
    InvalidGid(String),

    #[error("malformed table payload: {0}")]
    MalformedPayload(String),

    #[error("failed to parse metadata document at {path}: {message}")]
    MetadataParse { path: String, message: String },

    #[error("missing required setting: {0}")]
    #[diagnostic(help("pass it on the command line or through its environment variable"))]
    MissingSetting(&'static str),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
