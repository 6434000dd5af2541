use std::process::ExitCode;

use camino::Utf8PathBuf;
use chrono::Utc;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use sheet_dataset_sync::config::{ConfigLoader, ConfigOverrides};
use sheet_dataset_sync::error::SyncError;
use sheet_dataset_sync::manifest::ManifestHttpClient;
use sheet_dataset_sync::output::{JsonOutput, OutputMode, TextOutput};
use sheet_dataset_sync::sheets::SheetsHttpClient;
use sheet_dataset_sync::sync::Syncer;

#[derive(Parser)]
#[command(name = "sheet-sync")]
#[command(about = "Sync spreadsheet tables into versioned CSV files with a JSON changelog")]
#[command(version, author)]
struct Cli {
    /// Google Sheets API key
    #[arg(long, env = "SHEETS_NEW_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Commit that historical download links are pinned to
    #[arg(long = "commit", env = "CURRENT_COMMIT")]
    commit_ref: Option<String>,

    #[arg(long, env = "MANIFEST_URL")]
    manifest_url: Option<String>,

    /// Directory holding the project folders and the metadata document
    #[arg(long)]
    root: Option<Utf8PathBuf>,

    #[arg(long)]
    config: Option<String>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::MissingSetting(_) | SyncError::ConfigRead(_) | SyncError::ConfigParse(_) => 2,
        SyncError::InvalidFetch { .. }
        | SyncError::ManifestHttp(_)
        | SyncError::ManifestStatus { .. }
        | SyncError::SheetsHttp(_)
        | SyncError::SheetsStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let overrides = ConfigOverrides {
        api_key: cli.api_key,
        commit_ref: cli.commit_ref,
        manifest_url: cli.manifest_url,
        root: cli.root,
    };
    let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;

    let manifest = ManifestHttpClient::new()?;
    let sheets = SheetsHttpClient::new()?;
    let syncer = Syncer::new(config, manifest, sheets);
    let report = syncer.run(Utc::now().date_naive())?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_report(&report).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_report(&report).into_diagnostic()?,
    }
    Ok(())
}
