use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::SyncError;

const MAX_SHEET_NAME_LEN: usize = 100;
/// Magnitude from which numbers print in exponent form, `1e+21`.
const EXPONENT_THRESHOLD: f64 = 1e21;
const FORBIDDEN_SHEET_CHARS: &[char] = &['*', '?', ':', '/', '\\', '[', ']', '\''];

/// One entry of the remote manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub sheet_id: String,
    #[serde(default)]
    pub raw_data_tables: Vec<DatasetSpec>,
}

impl Project {
    /// Specs that name a table. `{}` placeholders in the manifest are skipped.
    pub fn datasets(&self) -> impl Iterator<Item = (&Gid, &DatasetSpec)> {
        self.raw_data_tables
            .iter()
            .filter_map(|spec| spec.gid.as_ref().map(|gid| (gid, spec)))
    }

    pub fn has_datasets(&self) -> bool {
        self.datasets().next().is_some()
    }

    pub fn gid_order(&self) -> Vec<String> {
        self.datasets().map(|(gid, _)| gid.to_string()).collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetSpec {
    #[serde(default)]
    pub gid: Option<Gid>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub headers: Option<u8>,
}

impl DatasetSpec {
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref().filter(|query| !query.is_empty())
    }

    /// Header rows are on unless the manifest says `"headers": 0`.
    pub fn include_headers(&self) -> bool {
        self.headers != Some(0)
    }
}

/// Identifier of one sheet inside a spreadsheet. The manifest carries it
/// either as a number or as a string; both normalise to the decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gid(String);

impl Gid {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_number(&self) -> Result<i64, SyncError> {
        self.0
            .trim()
            .parse()
            .map_err(|_| SyncError::InvalidGid(self.0.clone()))
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Gid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for Gid {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for Gid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawGid {
            Number(i64),
            Text(String),
        }

        Ok(match RawGid::deserialize(deserializer)? {
            RawGid::Number(value) => Gid::from(value),
            RawGid::Text(value) => Gid(value),
        })
    }
}

/// A sheet title that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetName(String);

impl SheetName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File stem used on disk: lowercase, spaces to `-`, anything outside
    /// `[a-z0-9-]` to `_`.
    pub fn sanitized(&self) -> String {
        sanitize_sheet_name(&self.0)
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.sanitized())
    }
}

impl fmt::Display for SheetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SheetName {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let is_valid = !value.trim().is_empty()
            && value.chars().count() <= MAX_SHEET_NAME_LEN
            && !value.contains(FORBIDDEN_SHEET_CHARS);
        if !is_valid {
            return Err(SyncError::InvalidSheetName(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

pub fn sanitize_sheet_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|ch| match ch {
            ' ' => '-',
            'a'..='z' | '0'..='9' | '-' => ch,
            _ => '_',
        })
        .collect()
}

/// A single value of a fetched table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(value) => f.write_str(value),
            // `-0` prints as `0`
            Cell::Number(value) if *value == 0.0 => f.write_str("0"),
            Cell::Number(value) if value.abs() >= EXPONENT_THRESHOLD => {
                let exp = format!("{value:e}");
                match exp.split_once('e') {
                    Some((mantissa, power)) if !power.starts_with('-') => {
                        write!(f, "{mantissa}e+{power}")
                    }
                    _ => f.write_str(&exp),
                }
            }
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Bool(value) => write!(f, "{value}"),
        }
    }
}

pub type Row = Vec<Cell>;

/// A table as returned by the sheet source, before sanitizing.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTable {
    pub sheet_name: SheetName,
    pub header: Option<Row>,
    pub rows: Vec<Row>,
}

impl FetchedTable {
    /// Header (when requested) followed by the data rows.
    pub fn into_rows(self) -> Vec<Row> {
        match self.header {
            Some(header) => std::iter::once(header).chain(self.rows).collect(),
            None => self.rows,
        }
    }
}
