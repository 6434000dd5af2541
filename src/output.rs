use std::io::{self, Write};

use serde::Serialize;

use crate::sync::SyncReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(result: &SyncReport) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_report(result: &SyncReport) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        for item in &result.datasets {
            let outcome = &item.outcome;
            write!(
                stdout,
                "{:<9} {}/{} (gid {})",
                outcome.action, item.project, outcome.file_name, outcome.gid
            )?;
            if let Some(previous) = &outcome.renamed_from {
                write!(stdout, " renamed from {previous}.csv")?;
            }
            writeln!(stdout)?;
        }
        writeln!(
            stdout,
            "{}: {} project(s), {} dataset(s), {} new version(s)",
            result.run_date,
            result.projects,
            result.datasets.len(),
            result.written()
        )
    }
}
